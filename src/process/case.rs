use super::{Processor, ProcessorSettings};
use crate::capsule::Capsule;
use crate::config::UnitConfig;
use crate::error::{ConduitError, ConduitResult};
use crate::registry::parse_settings;
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaseStyle {
    Lower,
    Upper,
    Snake,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CaseOptions {
    pub case: Option<CaseStyle>,
}

/// Changes the case of a string value. Non-string values pass through untouched.
#[derive(Debug, Clone)]
pub struct Case {
    style: CaseStyle,
    input_key: String,
    output_key: String,
}

impl Case {
    pub fn build(unit: &UnitConfig) -> ConduitResult<Box<dyn Processor>> {
        let settings: ProcessorSettings<CaseOptions> = parse_settings(unit)?;
        settings.require_input_key(&unit.unit_type)?;
        settings.require_output_key(&unit.unit_type)?;
        let style = settings
            .options
            .case
            .ok_or_else(|| ConduitError::missing_option(&unit.unit_type, "case"))?;

        Ok(Box::new(Self {
            style,
            input_key: settings.input_key,
            output_key: settings.output_key,
        }))
    }
}

fn snake_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 4);
    let mut previous_lower = false;
    for c in text.chars() {
        if c.is_whitespace() || c == '-' || c == '_' {
            if !out.is_empty() && !out.ends_with('_') {
                out.push('_');
            }
            previous_lower = false;
        } else if c.is_uppercase() {
            if previous_lower {
                out.push('_');
            }
            out.extend(c.to_lowercase());
            previous_lower = false;
        } else {
            out.push(c);
            previous_lower = c.is_lowercase() || c.is_ascii_digit();
        }
    }
    out.trim_end_matches('_').to_string()
}

impl Processor for Case {
    fn apply(&self, mut capsule: Capsule) -> ConduitResult<Option<Capsule>> {
        let Value::String(text) = capsule.get(&self.input_key) else {
            return Ok(Some(capsule));
        };

        let converted = match self.style {
            CaseStyle::Lower => text.to_lowercase(),
            CaseStyle::Upper => text.to_uppercase(),
            CaseStyle::Snake => snake_case(&text),
        };
        capsule.set(&self.output_key, Value::String(converted))?;
        Ok(Some(capsule))
    }

    fn name(&self) -> &str {
        "case"
    }
}
