//! Conduit: a single-run streaming data transformation pipeline
//!
//! Records are wrapped in [`capsule::Capsule`]s, pushed through a configurable transform
//! whose processors are optionally gated by conditions, and delivered to a sink. A run ends
//! on completion, on the first reported error, or on its deadline.

pub mod capsule;
pub mod condition;
pub mod config;
pub mod error;
pub mod logger;
pub mod pipeline;
pub mod process;
pub mod registry;
pub mod sink;
pub mod transform;

pub use capsule::Capsule;
pub use config::{PipelineConfig, RunConfig, ScanMethod, UnitConfig};
pub use error::{ConduitError, ConduitResult};
pub use pipeline::Orchestrator;
pub use registry::Registry;
