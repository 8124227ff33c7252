//! Condition engine
//!
//! A condition is an [`Operator`] combining zero or more [`Inspector`]s. Operators are
//! inspectors themselves, so conditions nest. An operator with no inspectors always
//! evaluates to `true`, which is what makes conditions optional on every unit.

pub mod exists;
pub mod length;
pub mod regexp;
pub mod strings;

pub use exists::Exists;
pub use length::Length;
pub use regexp::Regexp;
pub use strings::Strings;

use crate::capsule::Capsule;
use crate::config::UnitConfig;
use crate::error::{ConduitError, ConduitResult};
use serde::{Deserialize, Serialize};

/// A pure boolean test over a capsule
pub trait Inspector: Send + Sync {
    /// Evaluate against a capsule. Must not have side effects.
    fn inspect(&self, capsule: &Capsule) -> bool;

    /// Registered type name, for logging
    fn name(&self) -> &str;
}

/// Settings shared by every leaf inspector
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InspectorSettings<O> {
    /// Field path to inspect; empty inspects the whole payload
    #[serde(default)]
    pub key: String,

    /// Invert the result
    #[serde(default)]
    pub negate: bool,

    #[serde(default)]
    pub options: O,
}

/// Logical combinator applied over an operator's inspectors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatorKind {
    /// Every inspector passes
    All,
    /// At least one inspector passes
    Any,
    /// The single inspector fails
    Not,
    /// No inspector passes
    None,
}

impl OperatorKind {
    /// Parse an operator name. An empty name means `All`.
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "" | "and" | "all" => Some(OperatorKind::All),
            "or" | "any" => Some(OperatorKind::Any),
            "not" => Some(OperatorKind::Not),
            "none" | "nor" => Some(OperatorKind::None),
            _ => None,
        }
    }
}

/// Condition descriptor as it appears in unit settings
///
/// ```json
/// {"operator": "and", "inspectors": [{"type": "strings", "settings": {...}}]}
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct OperatorConfig {
    #[serde(default)]
    pub operator: String,

    #[serde(default)]
    pub inspectors: Vec<UnitConfig>,
}

/// A built condition
pub struct Operator {
    kind: OperatorKind,
    inspectors: Vec<Box<dyn Inspector>>,
}

impl Operator {
    pub fn new(kind: OperatorKind, inspectors: Vec<Box<dyn Inspector>>) -> ConduitResult<Self> {
        if kind == OperatorKind::Not && inspectors.len() > 1 {
            return Err(ConduitError::invalid_settings(
                "condition",
                format!("'not' takes one inspector, got {}", inspectors.len()),
            ));
        }
        Ok(Self { kind, inspectors })
    }

    /// An operator with no inspectors; always passes
    pub fn always() -> Self {
        Self {
            kind: OperatorKind::All,
            inspectors: Vec::new(),
        }
    }

    /// Evaluate the condition. `All` and `Any` short-circuit.
    pub fn evaluate(&self, capsule: &Capsule) -> bool {
        if self.inspectors.is_empty() {
            return true;
        }

        let mut results = self.inspectors.iter().map(|i| i.inspect(capsule));
        match self.kind {
            OperatorKind::All => results.all(|passed| passed),
            OperatorKind::Any => results.any(|passed| passed),
            OperatorKind::Not => !results.any(|passed| passed),
            OperatorKind::None => !results.any(|passed| passed),
        }
    }
}

impl Inspector for Operator {
    fn inspect(&self, capsule: &Capsule) -> bool {
        self.evaluate(capsule)
    }

    fn name(&self) -> &str {
        "condition"
    }
}
