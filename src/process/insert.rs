use super::{Processor, ProcessorSettings};
use crate::capsule::Capsule;
use crate::config::UnitConfig;
use crate::error::{ConduitError, ConduitResult};
use crate::registry::parse_settings;
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct InsertOptions {
    pub value: Option<Value>,
}

/// Sets a fixed value at `output_key`
#[derive(Debug, Clone)]
pub struct Insert {
    value: Value,
    output_key: String,
}

impl Insert {
    pub fn build(unit: &UnitConfig) -> ConduitResult<Box<dyn Processor>> {
        let settings: ProcessorSettings<InsertOptions> = parse_settings(unit)?;
        settings.require_output_key(&unit.unit_type)?;
        let value = settings
            .options
            .value
            .ok_or_else(|| ConduitError::missing_option(&unit.unit_type, "value"))?;

        Ok(Box::new(Self {
            value,
            output_key: settings.output_key,
        }))
    }
}

impl Processor for Insert {
    fn apply(&self, mut capsule: Capsule) -> ConduitResult<Option<Capsule>> {
        capsule.set(&self.output_key, self.value.clone())?;
        Ok(Some(capsule))
    }

    fn name(&self) -> &str {
        "insert"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_insert_object() {
        let unit = UnitConfig::new(
            "insert",
            json!({"options": {"value": {"env": "prod"}}, "output_key": "meta"}),
        );
        let insert = Insert::build(&unit).unwrap();
        let result = insert.apply(Capsule::new(json!({"a": 1}))).unwrap().unwrap();
        assert_eq!(result.data(), &json!({"a": 1, "meta": {"env": "prod"}}));
    }

    #[test]
    fn test_insert_into_text_payload_fails() {
        let unit = UnitConfig::new("insert", json!({"options": {"value": 1}, "output_key": "n"}));
        let insert = Insert::build(&unit).unwrap();
        assert!(matches!(
            insert.apply(Capsule::new(json!("raw line"))),
            Err(ConduitError::InvalidDataPattern(_))
        ));
    }

    #[test]
    fn test_value_required() {
        let unit = UnitConfig::new("insert", json!({"output_key": "n"}));
        assert!(matches!(
            Insert::build(&unit),
            Err(ConduitError::MissingOption { .. })
        ));
    }
}
