use super::Processor;
use crate::capsule::Capsule;
use crate::config::UnitConfig;
use crate::error::ConduitResult;

/// Drops every capsule it is applied to; pair it with a condition to filter
#[derive(Debug, Clone, Default)]
pub struct DropCapsule;

impl DropCapsule {
    pub fn build(unit: &UnitConfig) -> ConduitResult<Box<dyn Processor>> {
        // settings are unused, but must still be well-formed
        unit.resolved_settings()?;
        Ok(Box::new(Self))
    }
}

impl Processor for DropCapsule {
    fn apply(&self, _capsule: Capsule) -> ConduitResult<Option<Capsule>> {
        Ok(None)
    }

    fn name(&self) -> &str {
        "drop"
    }
}
