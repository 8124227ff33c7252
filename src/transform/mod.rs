//! Transforms: the unit run by every processing worker
//!
//! A transform consumes the shared input queue until it is closed and drained, writes
//! results to the output queue, and returns as soon as `kill` is observed without
//! draining whatever is still queued.

pub mod batch;
pub mod process;
pub mod transfer;

pub use batch::BatchTransform;
pub use process::ProcessTransform;
pub use transfer::Transfer;

use crate::capsule::Capsule;
use crate::config::UnitConfig;
use crate::error::{ConduitError, ConduitResult};
use crate::pipeline::signals::{KillSignal, SharedReceiver};
use async_trait::async_trait;
use serde::Deserialize;
use tokio::sync::mpsc;

#[async_trait]
pub trait Transform: Send + Sync {
    /// Consume `input` until it closes or `kill` is raised.
    ///
    /// Several workers may call this concurrently on the same queues.
    async fn transform(
        &self,
        input: &SharedReceiver,
        output: &mpsc::Sender<Capsule>,
        kill: &KillSignal,
    ) -> ConduitResult<()>;

    /// Registered type name, for logging
    fn name(&self) -> &str;
}

/// Settings shared by transforms that run processors
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TransformSettings {
    #[serde(default)]
    pub processors: Vec<UnitConfig>,
}

/// Outcome of one receive on the input queue
#[derive(Debug)]
pub enum Received {
    Capsule(Capsule),
    Closed,
    Killed,
}

/// Receive the next capsule, giving `kill` priority over queued data
pub async fn receive(input: &SharedReceiver, kill: &KillSignal) -> Received {
    if kill.is_raised() {
        return Received::Killed;
    }

    tokio::select! {
        biased;
        _ = kill.raised() => Received::Killed,
        next = async { input.lock().await.recv().await } => match next {
            Some(capsule) => Received::Capsule(capsule),
            None => Received::Closed,
        },
    }
}

/// Send a capsule downstream. Returns `Ok(false)` when `kill` interrupted the send.
pub async fn emit(
    output: &mpsc::Sender<Capsule>,
    capsule: Capsule,
    kill: &KillSignal,
) -> ConduitResult<bool> {
    tokio::select! {
        biased;
        _ = kill.raised() => Ok(false),
        sent = output.send(capsule) => sent
            .map(|_| true)
            .map_err(|_| ConduitError::QueueClosed("output")),
    }
}
