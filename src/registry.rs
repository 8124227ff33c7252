//! Unit registry for building pipeline units from configuration
//!
//! Every unit is selected by the `type` string of its [`UnitConfig`] and looked up in a
//! static registration table. This is the only place where configuration turns into
//! trait objects; call sites never branch on unit type.

use crate::condition::{
    Exists, Inspector, Length, Operator, OperatorConfig, OperatorKind, Regexp, Strings,
};
use crate::config::UnitConfig;
use crate::error::{ConduitError, ConduitResult};
use crate::logger::{LogLevel, LOGGER};
use crate::process::{
    Base64, Case, ConditionalProcessor, CopyValue, Delete, DropCapsule, Hash, Insert, Math,
    Processor,
};
use crate::sink::{FileSink, Sink, StdoutSink};
use crate::transform::{BatchTransform, ProcessTransform, Transfer, Transform};
use once_cell::sync::Lazy;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

type InspectorCtor = fn(&UnitConfig) -> ConduitResult<Box<dyn Inspector>>;
type ProcessorCtor = fn(&UnitConfig) -> ConduitResult<Box<dyn Processor>>;
type TransformCtor = fn(&UnitConfig) -> ConduitResult<Arc<dyn Transform>>;
type SinkCtor = fn(&UnitConfig) -> ConduitResult<Box<dyn Sink>>;

static INSPECTORS: Lazy<HashMap<&'static str, InspectorCtor>> = Lazy::new(|| {
    let mut table: HashMap<&'static str, InspectorCtor> = HashMap::new();
    table.insert("strings", Strings::build);
    table.insert("regexp", Regexp::build);
    table.insert("length", Length::build);
    table.insert("exists", Exists::build);
    table.insert("condition", build_nested_condition);
    table
});

static PROCESSORS: Lazy<HashMap<&'static str, ProcessorCtor>> = Lazy::new(|| {
    let mut table: HashMap<&'static str, ProcessorCtor> = HashMap::new();
    table.insert("math", Math::build);
    table.insert("copy", CopyValue::build);
    table.insert("insert", Insert::build);
    table.insert("delete", Delete::build);
    table.insert("case", Case::build);
    table.insert("hash", Hash::build);
    table.insert("base64", Base64::build);
    table.insert("drop", DropCapsule::build);
    table
});

static TRANSFORMS: Lazy<HashMap<&'static str, TransformCtor>> = Lazy::new(|| {
    let mut table: HashMap<&'static str, TransformCtor> = HashMap::new();
    table.insert("process", ProcessTransform::build);
    table.insert("batch", BatchTransform::build);
    table.insert("transfer", Transfer::build);
    table
});

static SINKS: Lazy<HashMap<&'static str, SinkCtor>> = Lazy::new(|| {
    let mut table: HashMap<&'static str, SinkCtor> = HashMap::new();
    table.insert("stdout", StdoutSink::build);
    table.insert("file", FileSink::build);
    table
});

/// Deserialize a unit's resolved settings into its typed settings struct
pub(crate) fn parse_settings<T: DeserializeOwned>(unit: &UnitConfig) -> ConduitResult<T> {
    let settings = Value::Object(unit.resolved_settings()?);
    serde_json::from_value(settings)
        .map_err(|e| ConduitError::invalid_settings(&unit.unit_type, e))
}

fn build_nested_condition(unit: &UnitConfig) -> ConduitResult<Box<dyn Inspector>> {
    let config: OperatorConfig = parse_settings(unit)?;
    Ok(Box::new(Registry::build_operator(&config)?))
}

fn lookup<C: Copy>(
    table: &HashMap<&'static str, C>,
    kind: &'static str,
    unit: &UnitConfig,
) -> ConduitResult<C> {
    table.get(unit.unit_type.as_str()).copied().ok_or_else(|| {
        let mut names: Vec<&str> = table.keys().copied().collect();
        names.sort_unstable();
        let registered = names.join(", ");

        LOGGER.log(
            LogLevel::Error,
            &format!(
                "Unknown {} type: {} (registered: {})",
                kind, unit.unit_type, registered
            ),
            "registry",
        );
        ConduitError::UnknownType {
            kind,
            name: unit.unit_type.clone(),
            registered,
        }
    })
}

/// Registry for constructing units from descriptors
///
/// Construction is all-or-nothing: the first invalid descriptor fails the whole build and
/// nothing partially built is returned.
pub struct Registry;

impl Registry {
    /// Build one leaf inspector or nested condition
    pub fn build_inspector(unit: &UnitConfig) -> ConduitResult<Box<dyn Inspector>> {
        let ctor = lookup(&INSPECTORS, "inspector", unit)?;
        ctor(unit)
    }

    /// Build a condition from its descriptor
    pub fn build_operator(config: &OperatorConfig) -> ConduitResult<Operator> {
        let kind = OperatorKind::parse(&config.operator).ok_or_else(|| {
            ConduitError::invalid_settings(
                "condition",
                format!("unknown operator '{}'", config.operator),
            )
        })?;

        let inspectors = config
            .inspectors
            .iter()
            .map(Self::build_inspector)
            .collect::<ConduitResult<Vec<_>>>()?;

        Operator::new(kind, inspectors)
    }

    /// Build a processor together with the condition found under `settings.condition`
    pub fn build_processor(unit: &UnitConfig) -> ConduitResult<ConditionalProcessor> {
        let ctor = lookup(&PROCESSORS, "processor", unit)?;

        let condition = match unit.resolved_settings()?.remove("condition") {
            None | Some(Value::Null) => OperatorConfig::default(),
            Some(raw) => serde_json::from_value(raw)
                .map_err(|e| ConduitError::invalid_settings(&unit.unit_type, e))?,
        };

        let operator = Self::build_operator(&condition)?;
        let processor = ctor(unit)?;
        Ok(ConditionalProcessor::new(operator, processor))
    }

    pub fn build_processors(units: &[UnitConfig]) -> ConduitResult<Vec<ConditionalProcessor>> {
        units.iter().map(Self::build_processor).collect()
    }

    pub fn build_transform(unit: &UnitConfig) -> ConduitResult<Arc<dyn Transform>> {
        let ctor = lookup(&TRANSFORMS, "transform", unit)?;
        ctor(unit)
    }

    pub fn build_sink(unit: &UnitConfig) -> ConduitResult<Box<dyn Sink>> {
        let ctor = lookup(&SINKS, "sink", unit)?;
        ctor(unit)
    }
}
