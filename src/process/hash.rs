use super::{Processor, ProcessorSettings};
use crate::capsule::{render_text, Capsule};
use crate::config::UnitConfig;
use crate::error::ConduitResult;
use crate::registry::parse_settings;
use serde::Deserialize;
use serde_json::Value;
use sha2::{Digest, Sha256};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    #[default]
    Sha256,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct HashOptions {
    #[serde(default)]
    pub algorithm: HashAlgorithm,
}

/// Writes the hex digest of a value's text rendering
#[derive(Debug, Clone)]
pub struct Hash {
    algorithm: HashAlgorithm,
    input_key: String,
    output_key: String,
}

impl Hash {
    pub fn build(unit: &UnitConfig) -> ConduitResult<Box<dyn Processor>> {
        let settings: ProcessorSettings<HashOptions> = parse_settings(unit)?;
        settings.require_output_key(&unit.unit_type)?;

        Ok(Box::new(Self {
            algorithm: settings.options.algorithm,
            input_key: settings.input_key,
            output_key: settings.output_key,
        }))
    }

    fn digest(&self, bytes: &[u8]) -> String {
        match self.algorithm {
            HashAlgorithm::Sha256 => {
                let mut hasher = Sha256::new();
                hasher.update(bytes);
                hex::encode(hasher.finalize())
            }
        }
    }
}

impl Processor for Hash {
    fn apply(&self, mut capsule: Capsule) -> ConduitResult<Option<Capsule>> {
        let value = capsule.get(&self.input_key);
        if value.is_null() {
            return Ok(Some(capsule));
        }

        let digest = self.digest(render_text(&value).as_bytes());
        capsule.set(&self.output_key, Value::String(digest))?;
        Ok(Some(capsule))
    }

    fn name(&self) -> &str {
        "hash"
    }
}
