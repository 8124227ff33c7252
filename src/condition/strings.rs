use super::{Inspector, InspectorSettings};
use crate::capsule::Capsule;
use crate::config::UnitConfig;
use crate::error::{ConduitError, ConduitResult};
use crate::registry::parse_settings;
use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StringMatch {
    Equals,
    Contains,
    StartsWith,
    EndsWith,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StringsOptions {
    #[serde(rename = "type")]
    pub match_type: Option<StringMatch>,
    #[serde(default)]
    pub expression: String,
}

/// Compares the text at a key against a fixed expression
#[derive(Debug, Clone)]
pub struct Strings {
    key: String,
    negate: bool,
    match_type: StringMatch,
    expression: String,
}

impl Strings {
    pub fn new(key: impl Into<String>, match_type: StringMatch, expression: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            negate: false,
            match_type,
            expression: expression.into(),
        }
    }

    pub fn build(unit: &UnitConfig) -> ConduitResult<Box<dyn Inspector>> {
        let settings: InspectorSettings<StringsOptions> = parse_settings(unit)?;
        let match_type = settings
            .options
            .match_type
            .ok_or_else(|| ConduitError::missing_option(&unit.unit_type, "type"))?;

        Ok(Box::new(Self {
            key: settings.key,
            negate: settings.negate,
            match_type,
            expression: settings.options.expression,
        }))
    }
}

impl Inspector for Strings {
    fn inspect(&self, capsule: &Capsule) -> bool {
        let text = capsule.get_text(&self.key);
        let matched = match self.match_type {
            StringMatch::Equals => text == self.expression,
            StringMatch::Contains => text.contains(&self.expression),
            StringMatch::StartsWith => text.starts_with(&self.expression),
            StringMatch::EndsWith => text.ends_with(&self.expression),
        };
        matched != self.negate
    }

    fn name(&self) -> &str {
        "strings"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_match_types() {
        let capsule = Capsule::new(json!({"user": "alice@example.com"}));

        assert!(Strings::new("user", StringMatch::Equals, "alice@example.com").inspect(&capsule));
        assert!(Strings::new("user", StringMatch::Contains, "@example").inspect(&capsule));
        assert!(Strings::new("user", StringMatch::StartsWith, "alice").inspect(&capsule));
        assert!(Strings::new("user", StringMatch::EndsWith, ".com").inspect(&capsule));
        assert!(!Strings::new("user", StringMatch::Equals, "bob").inspect(&capsule));

        let negated = Strings {
            negate: true,
            ..Strings::new("user", StringMatch::Equals, "bob")
        };
        assert!(negated.inspect(&capsule));
    }

    #[test]
    fn test_build_from_settings() {
        let unit = UnitConfig::new(
            "strings",
            json!({"key": "level", "options": {"type": "equals", "expression": "error"}}),
        );
        let inspector = Strings::build(&unit).unwrap();
        assert!(inspector.inspect(&Capsule::new(json!({"level": "error"}))));
        assert!(!inspector.inspect(&Capsule::new(json!({"level": "info"}))));
    }

    #[test]
    fn test_build_requires_type() {
        let unit = UnitConfig::new("strings", json!({"key": "level"}));
        assert!(matches!(
            Strings::build(&unit),
            Err(ConduitError::MissingOption { .. })
        ));
    }

    #[test]
    fn test_build_rejects_unknown_type() {
        let unit = UnitConfig::new("strings", json!({"options": {"type": "fuzzy"}}));
        assert!(matches!(
            Strings::build(&unit),
            Err(ConduitError::InvalidSettings { .. })
        ));
    }
}
