use super::{Processor, ProcessorSettings};
use crate::capsule::{render_text, Capsule};
use crate::config::UnitConfig;
use crate::error::{ConduitError, ConduitResult};
use crate::registry::parse_settings;
use ::base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    To,
    From,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Base64Options {
    pub direction: Option<Direction>,
}

/// Encodes a value to base64, or decodes base64 text back to a string
#[derive(Debug, Clone)]
pub struct Base64 {
    direction: Direction,
    input_key: String,
    output_key: String,
}

impl Base64 {
    pub fn build(unit: &UnitConfig) -> ConduitResult<Box<dyn Processor>> {
        let settings: ProcessorSettings<Base64Options> = parse_settings(unit)?;
        settings.require_output_key(&unit.unit_type)?;
        let direction = settings
            .options
            .direction
            .ok_or_else(|| ConduitError::missing_option(&unit.unit_type, "direction"))?;

        Ok(Box::new(Self {
            direction,
            input_key: settings.input_key,
            output_key: settings.output_key,
        }))
    }
}

impl Processor for Base64 {
    fn apply(&self, mut capsule: Capsule) -> ConduitResult<Option<Capsule>> {
        let value = capsule.get(&self.input_key);
        if value.is_null() {
            return Ok(Some(capsule));
        }

        let text = render_text(&value);
        let converted = match self.direction {
            Direction::To => STANDARD.encode(text.as_bytes()),
            Direction::From => {
                let decoded = STANDARD
                    .decode(text.trim())
                    .map_err(|e| ConduitError::processor_failed("base64", e))?;
                String::from_utf8(decoded).map_err(|e| {
                    ConduitError::processor_failed("base64", format!("decoded bytes: {}", e))
                })?
            }
        };

        capsule.set(&self.output_key, Value::String(converted))?;
        Ok(Some(capsule))
    }

    fn name(&self) -> &str {
        "base64"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn base64(direction: &str) -> Box<dyn Processor> {
        Base64::build(&UnitConfig::new(
            "base64",
            json!({"options": {"direction": direction}, "input_key": "v", "output_key": "v"}),
        ))
        .unwrap()
    }

    #[test]
    fn test_encode_and_decode() {
        let encoded = base64("to")
            .apply(Capsule::new(json!({"v": "hello"})))
            .unwrap()
            .unwrap();
        assert_eq!(encoded.get("v"), json!("aGVsbG8="));

        let decoded = base64("from").apply(encoded).unwrap().unwrap();
        assert_eq!(decoded.get("v"), json!("hello"));
    }

    #[test]
    fn test_invalid_input_fails() {
        let result = base64("from").apply(Capsule::new(json!({"v": "***"})));
        assert!(matches!(result, Err(ConduitError::ProcessorFailed { .. })));
    }

    #[test]
    fn test_direction_required() {
        let unit = UnitConfig::new("base64", json!({"output_key": "v"}));
        assert!(matches!(
            Base64::build(&unit),
            Err(ConduitError::MissingOption { .. })
        ));
    }
}
