use crate::error::{ConduitError, ConduitResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;

pub const CONCURRENCY_VAR: &str = "CONDUIT_CONCURRENCY";
pub const SCAN_METHOD_VAR: &str = "CONDUIT_SCAN_METHOD";
pub const BUFFER_SIZE_VAR: &str = "CONDUIT_BUFFER_SIZE";

/// Default queue capacity for a run
pub const DEFAULT_BUFFER_SIZE: usize = 1024;

/// Descriptor used to select and parametrize every unit at runtime
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UnitConfig {
    /// Registered type name, e.g. "math" or "stdout"
    #[serde(rename = "type")]
    pub unit_type: String,

    /// Unit-specific settings
    #[serde(default)]
    pub settings: Value,

    /// Descriptor-level field paths, accepted as a shorthand for `settings.input_key`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_key: Option<String>,

    /// Descriptor-level field paths, accepted as a shorthand for `settings.output_key`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_key: Option<String>,
}

impl UnitConfig {
    pub fn new(unit_type: impl Into<String>, settings: Value) -> Self {
        Self {
            unit_type: unit_type.into(),
            settings,
            input_key: None,
            output_key: None,
        }
    }

    /// Settings as an object, with descriptor-level keys folded in.
    ///
    /// Keys already present in `settings` win over the descriptor-level shorthand.
    pub fn resolved_settings(&self) -> ConduitResult<serde_json::Map<String, Value>> {
        let mut settings = match &self.settings {
            Value::Null => serde_json::Map::new(),
            Value::Object(map) => map.clone(),
            other => {
                return Err(ConduitError::invalid_settings(
                    &self.unit_type,
                    format!("settings must be an object, got {}", other),
                ))
            }
        };

        if let Some(key) = &self.input_key {
            settings
                .entry("input_key")
                .or_insert_with(|| Value::String(key.clone()));
        }
        if let Some(key) = &self.output_key {
            settings
                .entry("output_key")
                .or_insert_with(|| Value::String(key.clone()));
        }

        Ok(settings)
    }
}

/// Units making up one pipeline run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub transform: UnitConfig,
    pub sink: UnitConfig,
}

impl PipelineConfig {
    pub fn from_json(json: &str) -> ConduitResult<Self> {
        serde_json::from_str(json)
            .map_err(|e| ConduitError::ConfigError(format!("Invalid pipeline config: {}", e)))
    }

    pub fn from_file(path: impl AsRef<Path>) -> ConduitResult<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            ConduitError::ConfigError(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_json(&contents)
    }
}

/// How raw input is framed before it becomes a capsule
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ScanMethod {
    /// Raw bytes; payloads that are not UTF-8 are preserved as base64
    Bytes,

    /// UTF-8 text, decoded lossily
    #[default]
    Text,
}

impl ScanMethod {
    /// Parse a scan method, falling back to `Text` for anything unrecognized
    pub fn parse_or_default(value: Option<&str>) -> Self {
        match value {
            Some("bytes") => ScanMethod::Bytes,
            _ => ScanMethod::Text,
        }
    }
}

/// Run-level settings read from the environment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    /// Number of processing workers
    pub concurrency: usize,

    pub scan_method: ScanMethod,

    /// Capacity of every queue in the run
    pub buffer_size: usize,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            concurrency: num_cpus::get(),
            scan_method: ScanMethod::Text,
            buffer_size: DEFAULT_BUFFER_SIZE,
        }
    }
}

impl RunConfig {
    /// Load from `CONDUIT_*` environment variables
    pub fn from_env() -> ConduitResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load using an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> ConduitResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let concurrency = match lookup(CONCURRENCY_VAR) {
            Some(raw) => parse_positive(CONCURRENCY_VAR, &raw)?,
            None => defaults.concurrency,
        };

        let buffer_size = match lookup(BUFFER_SIZE_VAR) {
            Some(raw) => parse_positive(BUFFER_SIZE_VAR, &raw)?,
            None => defaults.buffer_size,
        };

        let scan_method = ScanMethod::parse_or_default(lookup(SCAN_METHOD_VAR).as_deref());

        Ok(Self {
            concurrency,
            scan_method,
            buffer_size,
        })
    }
}

fn parse_positive(var: &str, raw: &str) -> ConduitResult<usize> {
    match raw.trim().parse::<usize>() {
        Ok(0) => Err(ConduitError::ConfigError(format!("{} must be at least 1", var))),
        Ok(value) => Ok(value),
        Err(e) => Err(ConduitError::ConfigError(format!(
            "{} is not a valid integer ({}): {}",
            var, raw, e
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashMap;

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults_without_env() {
        let config = RunConfig::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config.concurrency, num_cpus::get());
        assert_eq!(config.scan_method, ScanMethod::Text);
        assert_eq!(config.buffer_size, DEFAULT_BUFFER_SIZE);
    }

    #[test]
    fn test_env_overrides() {
        let config = RunConfig::from_lookup(lookup_from(&[
            (CONCURRENCY_VAR, "3"),
            (SCAN_METHOD_VAR, "bytes"),
            (BUFFER_SIZE_VAR, "16"),
        ]))
        .unwrap();
        assert_eq!(config.concurrency, 3);
        assert_eq!(config.scan_method, ScanMethod::Bytes);
        assert_eq!(config.buffer_size, 16);
    }

    #[test]
    fn test_invalid_concurrency() {
        assert!(RunConfig::from_lookup(lookup_from(&[(CONCURRENCY_VAR, "many")])).is_err());
        assert!(RunConfig::from_lookup(lookup_from(&[(CONCURRENCY_VAR, "0")])).is_err());
    }

    #[test]
    fn test_unknown_scan_method_falls_back_to_text() {
        let config = RunConfig::from_lookup(lookup_from(&[(SCAN_METHOD_VAR, "lines")])).unwrap();
        assert_eq!(config.scan_method, ScanMethod::Text);
    }

    #[test]
    fn test_pipeline_config_parsing() {
        let config = PipelineConfig::from_json(
            r#"{
                "transform": {"type": "transfer"},
                "sink": {"type": "stdout"}
            }"#,
        )
        .unwrap();
        assert_eq!(config.transform.unit_type, "transfer");
        assert_eq!(config.sink.settings, Value::Null);

        assert!(PipelineConfig::from_json(r#"{"sink": {"type": "stdout"}}"#).is_err());
    }

    #[test]
    fn test_resolved_settings_folds_descriptor_keys() {
        let unit: UnitConfig = serde_json::from_value(json!({
            "type": "math",
            "settings": {"options": {"operation": "add"}, "output_key": "total"},
            "input_key": "math",
            "output_key": "ignored"
        }))
        .unwrap();

        let settings = unit.resolved_settings().unwrap();
        assert_eq!(settings["input_key"], json!("math"));
        assert_eq!(settings["output_key"], json!("total"));
    }

    #[test]
    fn test_non_object_settings_rejected() {
        let unit = UnitConfig::new("math", json!([1, 2]));
        assert!(matches!(
            unit.resolved_settings(),
            Err(ConduitError::InvalidSettings { .. })
        ));
    }
}
