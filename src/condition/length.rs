use super::{Inspector, InspectorSettings};
use crate::capsule::{render_text, Capsule};
use crate::config::UnitConfig;
use crate::error::{ConduitError, ConduitResult};
use crate::registry::parse_settings;
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LengthComparison {
    Equals,
    GreaterThan,
    LessThan,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Measurement {
    #[default]
    Byte,
    Char,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LengthOptions {
    #[serde(rename = "type")]
    pub comparison: Option<LengthComparison>,
    pub value: Option<usize>,
    #[serde(default)]
    pub measurement: Measurement,
}

/// Compares the length of the value at a key; arrays measure their element count
#[derive(Debug, Clone)]
pub struct Length {
    key: String,
    negate: bool,
    comparison: LengthComparison,
    value: usize,
    measurement: Measurement,
}

impl Length {
    pub fn build(unit: &UnitConfig) -> ConduitResult<Box<dyn Inspector>> {
        let settings: InspectorSettings<LengthOptions> = parse_settings(unit)?;
        let comparison = settings
            .options
            .comparison
            .ok_or_else(|| ConduitError::missing_option(&unit.unit_type, "type"))?;
        let value = settings
            .options
            .value
            .ok_or_else(|| ConduitError::missing_option(&unit.unit_type, "value"))?;

        Ok(Box::new(Self {
            key: settings.key,
            negate: settings.negate,
            comparison,
            value,
            measurement: settings.options.measurement,
        }))
    }

    fn measure(&self, value: &Value) -> usize {
        match value {
            Value::Array(items) => items.len(),
            other => {
                let text = render_text(other);
                match self.measurement {
                    Measurement::Byte => text.len(),
                    Measurement::Char => text.chars().count(),
                }
            }
        }
    }
}

impl Inspector for Length {
    fn inspect(&self, capsule: &Capsule) -> bool {
        let length = self.measure(&capsule.get(&self.key));
        let matched = match self.comparison {
            LengthComparison::Equals => length == self.value,
            LengthComparison::GreaterThan => length > self.value,
            LengthComparison::LessThan => length < self.value,
        };
        matched != self.negate
    }

    fn name(&self) -> &str {
        "length"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn build(settings: Value) -> Box<dyn Inspector> {
        Length::build(&UnitConfig::new("length", settings)).unwrap()
    }

    #[test]
    fn test_byte_and_char_measurement() {
        let capsule = Capsule::new(json!({"word": "héllo"}));

        let bytes = build(json!({"key": "word", "options": {"type": "equals", "value": 6}}));
        assert!(bytes.inspect(&capsule));

        let chars = build(json!({
            "key": "word",
            "options": {"type": "equals", "value": 5, "measurement": "char"}
        }));
        assert!(chars.inspect(&capsule));
    }

    #[test]
    fn test_array_element_count() {
        let capsule = Capsule::new(json!({"items": [1, 2, 3]}));
        let inspector = build(json!({"key": "items", "options": {"type": "greater_than", "value": 2}}));
        assert!(inspector.inspect(&capsule));
    }

    #[test]
    fn test_missing_value_option() {
        let unit = UnitConfig::new("length", json!({"options": {"type": "less_than"}}));
        assert!(matches!(
            Length::build(&unit),
            Err(ConduitError::MissingOption { .. })
        ));
    }
}
