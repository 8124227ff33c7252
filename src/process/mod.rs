//! Processors and the conditional application protocol
//!
//! A [`Processor`] transforms one capsule. The registry wraps every configured processor
//! in a [`ConditionalProcessor`], which decides per capsule whether it runs.
//!
//! Processor descriptors look like:
//! ```json
//! {
//!   "type": "math",
//!   "settings": {
//!     "options": {"operation": "add"},
//!     "input_key": "math",
//!     "output_key": "math",
//!     "condition": {"operator": "and", "inspectors": []}
//!   }
//! }
//! ```

pub mod base64;
pub mod case;
pub mod copy;
pub mod delete;
pub mod drop;
pub mod hash;
pub mod insert;
pub mod math;

pub use self::base64::Base64;
pub use case::Case;
pub use copy::CopyValue;
pub use delete::Delete;
pub use drop::DropCapsule;
pub use hash::Hash;
pub use insert::Insert;
pub use math::Math;

use crate::capsule::Capsule;
use crate::condition::Operator;
use crate::error::{ConduitError, ConduitResult};
use serde::Deserialize;

/// A single-capsule transformation
pub trait Processor: Send + Sync {
    /// Apply to one capsule. `Ok(None)` drops the capsule.
    fn apply(&self, capsule: Capsule) -> ConduitResult<Option<Capsule>>;

    /// Registered type name, for logging and errors
    fn name(&self) -> &str;
}

/// Settings shared by every processor
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProcessorSettings<O> {
    #[serde(default)]
    pub options: O,

    #[serde(default)]
    pub input_key: String,

    #[serde(default)]
    pub output_key: String,
}

impl<O> ProcessorSettings<O> {
    pub(crate) fn require_input_key(&self, unit: &str) -> ConduitResult<()> {
        if self.input_key.is_empty() {
            return Err(ConduitError::InvalidDataPattern(format!(
                "{} requires input_key",
                unit
            )));
        }
        Ok(())
    }

    pub(crate) fn require_output_key(&self, unit: &str) -> ConduitResult<()> {
        if self.output_key.is_empty() {
            return Err(ConduitError::InvalidDataPattern(format!(
                "{} requires output_key",
                unit
            )));
        }
        Ok(())
    }
}

/// A processor gated by a condition
pub struct ConditionalProcessor {
    operator: Operator,
    processor: Box<dyn Processor>,
}

impl ConditionalProcessor {
    pub fn new(operator: Operator, processor: Box<dyn Processor>) -> Self {
        Self {
            operator,
            processor,
        }
    }

    /// A processor that applies to every capsule
    pub fn unconditional(processor: Box<dyn Processor>) -> Self {
        Self::new(Operator::always(), processor)
    }

    pub fn name(&self) -> &str {
        self.processor.name()
    }

    /// Apply to an ordered batch.
    ///
    /// Capsules failing the condition pass through unchanged; the rest are replaced by
    /// the processor's result or removed when it drops them. Output order follows input
    /// order. The first processor error discards the whole batch.
    pub fn apply_batch(&self, capsules: Vec<Capsule>) -> ConduitResult<Vec<Capsule>> {
        let mut output = Vec::with_capacity(capsules.len());
        for capsule in capsules {
            if !self.operator.evaluate(&capsule) {
                output.push(capsule);
                continue;
            }
            if let Some(result) = self.processor.apply(capsule)? {
                output.push(result);
            }
        }
        Ok(output)
    }
}

/// Run a batch through every processor in order
pub fn apply_all(
    processors: &[ConditionalProcessor],
    capsules: Vec<Capsule>,
) -> ConduitResult<Vec<Capsule>> {
    processors
        .iter()
        .try_fold(capsules, |batch, processor| processor.apply_batch(batch))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::condition::{Exists, Inspector, OperatorKind};
    use serde_json::json;

    struct Tag;

    impl Processor for Tag {
        fn apply(&self, mut capsule: Capsule) -> ConduitResult<Option<Capsule>> {
            capsule.set("tagged", json!(true))?;
            Ok(Some(capsule))
        }

        fn name(&self) -> &str {
            "tag"
        }
    }

    struct FailOn(i64);

    impl Processor for FailOn {
        fn apply(&self, capsule: Capsule) -> ConduitResult<Option<Capsule>> {
            if capsule.get("id") == json!(self.0) {
                return Err(ConduitError::processor_failed("fail_on", "boom"));
            }
            Ok(Some(capsule))
        }

        fn name(&self) -> &str {
            "fail_on"
        }
    }

    fn gated_on(key: &str, processor: Box<dyn Processor>) -> ConditionalProcessor {
        let inspectors: Vec<Box<dyn Inspector>> = vec![Box::new(Exists::new(key))];
        ConditionalProcessor::new(
            Operator::new(OperatorKind::All, inspectors).unwrap(),
            processor,
        )
    }

    #[test]
    fn test_false_condition_passes_capsule_through() {
        let processor = gated_on("flag", Box::new(Tag));
        let batch = vec![
            Capsule::new(json!({"id": 1, "flag": true})),
            Capsule::new(json!({"id": 2})),
        ];

        let output = processor.apply_batch(batch).unwrap();
        assert_eq!(output[0].data(), &json!({"id": 1, "flag": true, "tagged": true}));
        assert_eq!(output[1].data(), &json!({"id": 2}));
    }

    #[test]
    fn test_empty_condition_applies_to_every_capsule() {
        let processor = ConditionalProcessor::unconditional(Box::new(Tag));
        let batch: Vec<Capsule> = (0..4).map(|i| Capsule::new(json!({"id": i}))).collect();

        let output = processor.apply_batch(batch).unwrap();
        assert_eq!(output.len(), 4);
        assert!(output.iter().all(|c| c.get("tagged") == json!(true)));
        let ids: Vec<_> = output.iter().map(|c| c.get("id")).collect();
        assert_eq!(ids, vec![json!(0), json!(1), json!(2), json!(3)]);
    }

    #[test]
    fn test_error_aborts_whole_batch() {
        let processor = ConditionalProcessor::unconditional(Box::new(FailOn(2)));
        let batch: Vec<Capsule> = (0..4).map(|i| Capsule::new(json!({"id": i}))).collect();
        assert!(matches!(
            processor.apply_batch(batch),
            Err(ConduitError::ProcessorFailed { .. })
        ));
    }

    #[test]
    fn test_dropped_capsules_are_removed() {
        let processor = gated_on("noise", Box::new(DropCapsule));
        let batch = vec![
            Capsule::new(json!({"id": 1, "noise": true})),
            Capsule::new(json!({"id": 2})),
        ];
        let output = processor.apply_batch(batch).unwrap();
        assert_eq!(output.len(), 1);
        assert_eq!(output[0].get("id"), json!(2));
    }

    #[test]
    fn test_apply_all_chains_in_order() {
        let processors = vec![
            ConditionalProcessor::unconditional(Box::new(Tag)),
            gated_on("tagged", Box::new(DropCapsule)),
        ];
        let output = apply_all(&processors, vec![Capsule::new(json!({}))]).unwrap();
        assert!(output.is_empty());
    }
}
