use super::{Inspector, InspectorSettings};
use crate::capsule::Capsule;
use crate::config::UnitConfig;
use crate::error::{ConduitError, ConduitResult};
use crate::registry::parse_settings;
use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExistsOptions {}

/// Passes when the key resolves to a non-null value
#[derive(Debug, Clone)]
pub struct Exists {
    key: String,
    negate: bool,
}

impl Exists {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            negate: false,
        }
    }

    pub fn build(unit: &UnitConfig) -> ConduitResult<Box<dyn Inspector>> {
        let settings: InspectorSettings<ExistsOptions> = parse_settings(unit)?;
        if settings.key.is_empty() {
            return Err(ConduitError::missing_option(&unit.unit_type, "key"));
        }

        Ok(Box::new(Self {
            key: settings.key,
            negate: settings.negate,
        }))
    }
}

impl Inspector for Exists {
    fn inspect(&self, capsule: &Capsule) -> bool {
        !capsule.get(&self.key).is_null() != self.negate
    }

    fn name(&self) -> &str {
        "exists"
    }
}
