//! Orchestration of a single pipeline run
//!
//! The [`Orchestrator`] owns every queue and signal of a run. It launches N processing
//! workers and one sink worker, each driven by a stage in [`stage`], and hands each of
//! them a [`RunContext`] carrying the `kill` observer and the error queue.
//!
//! Shutdown rules:
//! - the caller closes the input queue once ingestion is done;
//! - the sink raises completion only after the output queue is closed, drained and flushed;
//! - the first error reported wins `join`;
//! - `kill` is raised at most once and stops every worker without draining.

pub mod context;
pub mod ingest;
pub mod orchestrator;
pub mod runner;
pub mod signals;
pub mod stage;

pub use context::RunContext;
pub use ingest::scan;
pub use orchestrator::Orchestrator;
pub use runner::execute;
pub use signals::{CompletionNotice, KillSignal, KillSwitch, SharedReceiver};
pub use stage::{ProcessingStage, SinkStage, StageOutcome};
