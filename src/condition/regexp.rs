use super::{Inspector, InspectorSettings};
use crate::capsule::Capsule;
use crate::config::UnitConfig;
use crate::error::{ConduitError, ConduitResult};
use crate::registry::parse_settings;
use regex::Regex;
use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegexpOptions {
    pub expression: Option<String>,
}

/// Matches the text at a key against a regular expression compiled once at build time
#[derive(Debug, Clone)]
pub struct Regexp {
    key: String,
    negate: bool,
    expression: Regex,
}

impl Regexp {
    pub fn build(unit: &UnitConfig) -> ConduitResult<Box<dyn Inspector>> {
        let settings: InspectorSettings<RegexpOptions> = parse_settings(unit)?;
        let pattern = settings
            .options
            .expression
            .ok_or_else(|| ConduitError::missing_option(&unit.unit_type, "expression"))?;
        let expression =
            Regex::new(&pattern).map_err(|e| ConduitError::invalid_settings(&unit.unit_type, e))?;

        Ok(Box::new(Self {
            key: settings.key,
            negate: settings.negate,
            expression,
        }))
    }
}

impl Inspector for Regexp {
    fn inspect(&self, capsule: &Capsule) -> bool {
        self.expression.is_match(&capsule.get_text(&self.key)) != self.negate
    }

    fn name(&self) -> &str {
        "regexp"
    }
}
