use super::{Processor, ProcessorSettings};
use crate::capsule::Capsule;
use crate::config::UnitConfig;
use crate::error::ConduitResult;
use crate::registry::parse_settings;
use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DeleteOptions {}

/// Removes the value at `input_key`
#[derive(Debug, Clone)]
pub struct Delete {
    input_key: String,
}

impl Delete {
    pub fn build(unit: &UnitConfig) -> ConduitResult<Box<dyn Processor>> {
        let settings: ProcessorSettings<DeleteOptions> = parse_settings(unit)?;
        settings.require_input_key(&unit.unit_type)?;

        Ok(Box::new(Self {
            input_key: settings.input_key,
        }))
    }
}

impl Processor for Delete {
    fn apply(&self, mut capsule: Capsule) -> ConduitResult<Option<Capsule>> {
        capsule.delete(&self.input_key)?;
        Ok(Some(capsule))
    }

    fn name(&self) -> &str {
        "delete"
    }
}
