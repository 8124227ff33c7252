use super::{Processor, ProcessorSettings};
use crate::capsule::Capsule;
use crate::config::UnitConfig;
use crate::error::ConduitResult;
use crate::registry::parse_settings;
use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CopyOptions {}

/// Copies the value at `input_key` to `output_key`.
///
/// An empty `input_key` copies the whole payload; a missing input leaves the capsule
/// unchanged.
#[derive(Debug, Clone)]
pub struct CopyValue {
    input_key: String,
    output_key: String,
}

impl CopyValue {
    pub fn build(unit: &UnitConfig) -> ConduitResult<Box<dyn Processor>> {
        let settings: ProcessorSettings<CopyOptions> = parse_settings(unit)?;
        settings.require_output_key(&unit.unit_type)?;

        Ok(Box::new(Self {
            input_key: settings.input_key,
            output_key: settings.output_key,
        }))
    }
}

impl Processor for CopyValue {
    fn apply(&self, mut capsule: Capsule) -> ConduitResult<Option<Capsule>> {
        let value = capsule.get(&self.input_key);
        if !value.is_null() {
            capsule.set(&self.output_key, value)?;
        }
        Ok(Some(capsule))
    }

    fn name(&self) -> &str {
        "copy"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_copy_nested_value() {
        let unit = UnitConfig::new("copy", json!({"input_key": "a.b", "output_key": "c"}));
        let copy = CopyValue::build(&unit).unwrap();
        let result = copy
            .apply(Capsule::new(json!({"a": {"b": [1, 2]}})))
            .unwrap()
            .unwrap();
        assert_eq!(result.data(), &json!({"a": {"b": [1, 2]}, "c": [1, 2]}));
    }

    #[test]
    fn test_missing_input_is_a_no_op() {
        let unit = UnitConfig::new("copy", json!({"input_key": "missing", "output_key": "c"}));
        let copy = CopyValue::build(&unit).unwrap();
        let result = copy.apply(Capsule::new(json!({"a": 1}))).unwrap().unwrap();
        assert_eq!(result.data(), &json!({"a": 1}));
    }

    #[test]
    fn test_output_key_required() {
        let unit = UnitConfig::new("copy", json!({"input_key": "a"}));
        assert!(CopyValue::build(&unit).is_err());
    }
}
