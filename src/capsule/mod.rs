//! The data envelope that flows through every pipeline stage
//!
//! A [`Capsule`] carries a structured payload plus separate metadata. Stages take the
//! capsule by value, mutate it through [`Capsule::set`], and hand it to the next stage.

mod path;

use crate::config::ScanMethod;
use crate::error::ConduitResult;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use path::FieldPath;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// One record in flight
///
/// # Example
/// ```
/// use conduit_lib::capsule::Capsule;
/// use serde_json::json;
///
/// let mut capsule = Capsule::new(json!({"math": [1, 3]}));
/// assert_eq!(capsule.get("math"), json!([1, 3]));
///
/// capsule.set("math", json!(4)).unwrap();
/// assert_eq!(capsule.data(), &json!({"math": 4}));
/// ```
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Capsule {
    data: Value,

    #[serde(default, skip_serializing_if = "Value::is_null")]
    metadata: Value,
}

impl Capsule {
    /// Wrap a payload with empty metadata
    pub fn new(data: Value) -> Self {
        Self {
            data,
            metadata: Value::Null,
        }
    }

    /// Build a capsule from one raw input record.
    ///
    /// Records that parse as JSON keep their structure. Otherwise `Text` decodes the
    /// bytes lossily into a string payload; `Bytes` keeps valid UTF-8 as a string and
    /// base64-encodes anything else, noting the encoding in metadata.
    pub fn from_record(record: &[u8], method: ScanMethod) -> Self {
        if let Ok(data) = serde_json::from_slice::<Value>(record) {
            return Self::new(data);
        }

        match method {
            ScanMethod::Text => Self::new(Value::String(
                String::from_utf8_lossy(record).into_owned(),
            )),
            ScanMethod::Bytes => match std::str::from_utf8(record) {
                Ok(text) => Self::new(Value::String(text.to_string())),
                Err(_) => Self {
                    data: Value::String(STANDARD.encode(record)),
                    metadata: json!({"encoding": "base64"}),
                },
            },
        }
    }

    /// The whole payload
    pub fn data(&self) -> &Value {
        &self.data
    }

    pub fn into_data(self) -> Value {
        self.data
    }

    pub fn metadata(&self) -> &Value {
        &self.metadata
    }

    /// Value at `path`, or `Value::Null` when nothing matches.
    ///
    /// A path ending in an array yields the array; `#` segments collect one value per
    /// array element. An empty path returns the whole payload.
    pub fn get(&self, path: &str) -> Value {
        FieldPath::parse(path).lookup(&self.data)
    }

    /// Value at `path` viewed as a sequence: arrays yield their elements, a scalar yields
    /// itself, and a missing value yields nothing.
    pub fn get_array(&self, path: &str) -> Vec<Value> {
        match self.get(path) {
            Value::Null => Vec::new(),
            Value::Array(items) => items,
            other => vec![other],
        }
    }

    /// Write `value` at `path`. On error the capsule is left unchanged.
    pub fn set(&mut self, path: &str, value: Value) -> ConduitResult<()> {
        FieldPath::parse(path).assign(&mut self.data, value)
    }

    /// Remove the value at `path`, returning it if present
    pub fn delete(&mut self, path: &str) -> ConduitResult<Option<Value>> {
        FieldPath::parse(path).remove(&mut self.data)
    }

    pub fn get_metadata(&self, path: &str) -> Value {
        FieldPath::parse(path).lookup(&self.metadata)
    }

    pub fn set_metadata(&mut self, path: &str, value: Value) -> ConduitResult<()> {
        FieldPath::parse(path).assign(&mut self.metadata, value)
    }

    /// Text rendering of the value at `path`: strings raw, everything else as compact
    /// JSON. A missing value renders as an empty string.
    pub fn get_text(&self, path: &str) -> String {
        render_text(&self.get(path))
    }

    /// Bytes written for this capsule by line-oriented sinks
    pub fn to_line(&self) -> String {
        render_text(&self.data)
    }
}

pub(crate) fn render_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
