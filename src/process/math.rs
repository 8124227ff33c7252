use super::{Processor, ProcessorSettings};
use crate::capsule::Capsule;
use crate::config::UnitConfig;
use crate::error::{ConduitError, ConduitResult};
use crate::registry::parse_settings;
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MathOperation {
    Add,
    Subtract,
    Multiply,
    Divide,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MathOptions {
    pub operation: Option<MathOperation>,
}

/// Reduces the integers at `input_key` with one arithmetic operation.
///
/// ```json
/// {"math":[1,3]} >>> {"math":4}
/// ```
///
/// The first element seeds the accumulator, floats are truncated, and an empty or
/// missing input reduces to 0.
#[derive(Debug, Clone)]
pub struct Math {
    operation: MathOperation,
    input_key: String,
    output_key: String,
}

impl Math {
    pub fn new(
        operation: MathOperation,
        input_key: impl Into<String>,
        output_key: impl Into<String>,
    ) -> Self {
        Self {
            operation,
            input_key: input_key.into(),
            output_key: output_key.into(),
        }
    }

    pub fn build(unit: &UnitConfig) -> ConduitResult<Box<dyn Processor>> {
        let settings: ProcessorSettings<MathOptions> = parse_settings(unit)?;
        let operation = settings
            .options
            .operation
            .ok_or_else(|| ConduitError::missing_option(&unit.unit_type, "operation"))?;

        if settings.input_key.is_empty() && settings.output_key.is_empty() {
            return Err(ConduitError::InvalidDataPattern(format!(
                "{} requires input_key and output_key",
                unit.unit_type
            )));
        }

        Ok(Box::new(Self::new(
            operation,
            settings.input_key,
            settings.output_key,
        )))
    }

    fn reduce(&self, values: &[Value]) -> ConduitResult<i64> {
        let mut numbers = values.iter().map(as_integer);
        let Some(first) = numbers.next() else {
            return Ok(0);
        };

        numbers.try_fold(first, |acc, value| match self.operation {
            MathOperation::Add => Ok(acc.wrapping_add(value)),
            MathOperation::Subtract => Ok(acc.wrapping_sub(value)),
            MathOperation::Multiply => Ok(acc.wrapping_mul(value)),
            MathOperation::Divide if value == 0 => {
                Err(ConduitError::processor_failed("math", "division by zero"))
            }
            MathOperation::Divide => Ok(acc.wrapping_div(value)),
        })
    }
}

/// Integer view of a JSON value; non-numeric values count as 0
fn as_integer(value: &Value) -> i64 {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .unwrap_or_default(),
        Value::String(s) => s.trim().parse::<f64>().map(|f| f as i64).unwrap_or_default(),
        Value::Bool(b) => i64::from(*b),
        _ => 0,
    }
}

impl Processor for Math {
    fn apply(&self, mut capsule: Capsule) -> ConduitResult<Option<Capsule>> {
        let values = capsule.get_array(&self.input_key);
        let result = self.reduce(&values)?;
        capsule.set(&self.output_key, Value::from(result))?;
        Ok(Some(capsule))
    }

    fn name(&self) -> &str {
        "math"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn apply(operation: MathOperation, data: Value) -> Value {
        Math::new(operation, "math", "math")
            .apply(Capsule::new(data))
            .unwrap()
            .unwrap()
            .into_data()
    }

    #[test]
    fn test_add() {
        assert_eq!(apply(MathOperation::Add, json!({"math": [1, 3]})), json!({"math": 4}));
    }

    #[test]
    fn test_multiply() {
        assert_eq!(
            apply(MathOperation::Multiply, json!({"math": [1, 3]})),
            json!({"math": 3})
        );
    }

    #[test]
    fn test_subtract_and_divide() {
        assert_eq!(
            apply(MathOperation::Subtract, json!({"math": [10, 3, 2]})),
            json!({"math": 5})
        );
        assert_eq!(
            apply(MathOperation::Divide, json!({"math": [10, 3]})),
            json!({"math": 3})
        );
    }

    #[test]
    fn test_floats_truncate_and_empty_is_zero() {
        assert_eq!(
            apply(MathOperation::Add, json!({"math": [1.9, 2.9]})),
            json!({"math": 3})
        );
        assert_eq!(apply(MathOperation::Add, json!({"math": []})), json!({"math": 0}));
    }

    #[test]
    fn test_divide_by_zero_is_an_error() {
        let result = Math::new(MathOperation::Divide, "math", "math")
            .apply(Capsule::new(json!({"math": [1, 0]})));
        assert!(matches!(
            result,
            Err(ConduitError::ProcessorFailed { reason, .. }) if reason == "division by zero"
        ));
    }

    #[test]
    fn test_divide_overflow_wraps_like_other_operations() {
        assert_eq!(
            apply(MathOperation::Divide, json!({"math": [i64::MIN, -1]})),
            json!({"math": i64::MIN})
        );
        assert_eq!(
            apply(MathOperation::Add, json!({"math": [i64::MAX, 1]})),
            json!({"math": i64::MIN})
        );
    }

    #[test]
    fn test_build_validation() {
        let missing_operation = UnitConfig::new("math", json!({"input_key": "a"}));
        assert!(matches!(
            Math::build(&missing_operation),
            Err(ConduitError::MissingOption { .. })
        ));

        let bad_operation =
            UnitConfig::new("math", json!({"options": {"operation": "modulo"}, "input_key": "a"}));
        assert!(matches!(
            Math::build(&bad_operation),
            Err(ConduitError::InvalidSettings { .. })
        ));

        let no_keys = UnitConfig::new("math", json!({"options": {"operation": "add"}}));
        assert!(matches!(
            Math::build(&no_keys),
            Err(ConduitError::InvalidDataPattern(_))
        ));
    }
}
