use super::{emit, receive, Received, Transform, TransformSettings};
use crate::capsule::Capsule;
use crate::config::UnitConfig;
use crate::error::ConduitResult;
use crate::logger::{LogLevel, LOGGER};
use crate::pipeline::signals::{KillSignal, SharedReceiver};
use crate::process::{apply_all, ConditionalProcessor};
use crate::registry::{parse_settings, Registry};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Buffers everything a worker receives, then applies each processor to the whole batch.
///
/// With several workers each one batches its own share of the input. An error in any
/// processor discards the worker's batch; `kill` abandons it.
pub struct BatchTransform {
    processors: Vec<ConditionalProcessor>,
}

impl BatchTransform {
    pub fn new(processors: Vec<ConditionalProcessor>) -> Self {
        Self { processors }
    }

    pub fn build(unit: &UnitConfig) -> ConduitResult<Arc<dyn Transform>> {
        let settings: TransformSettings = parse_settings(unit)?;
        let processors = Registry::build_processors(&settings.processors)?;
        Ok(Arc::new(Self::new(processors)))
    }
}

#[async_trait]
impl Transform for BatchTransform {
    async fn transform(
        &self,
        input: &SharedReceiver,
        output: &mpsc::Sender<Capsule>,
        kill: &KillSignal,
    ) -> ConduitResult<()> {
        let mut batch = Vec::new();
        loop {
            match receive(input, kill).await {
                Received::Capsule(capsule) => batch.push(capsule),
                Received::Closed => break,
                Received::Killed => {
                    LOGGER.log(
                        LogLevel::Debug,
                        &format!("Abandoning batch of {} capsules", batch.len()),
                        "transform::batch",
                    );
                    return Ok(());
                }
            }
        }

        let received = batch.len();
        let results = apply_all(&self.processors, batch)?;
        LOGGER.log(
            LogLevel::Debug,
            &format!("Batch processed: {} in, {} out", received, results.len()),
            "transform::batch",
        );

        for capsule in results {
            if !emit(output, capsule, kill).await? {
                return Ok(());
            }
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "batch"
    }
}
