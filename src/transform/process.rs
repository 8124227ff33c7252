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

/// Streaming transform: each capsule runs through every processor as a batch of one and
/// is emitted as soon as it survives them
pub struct ProcessTransform {
    processors: Vec<ConditionalProcessor>,
}

impl ProcessTransform {
    pub fn new(processors: Vec<ConditionalProcessor>) -> Self {
        Self { processors }
    }

    pub fn build(unit: &UnitConfig) -> ConduitResult<Arc<dyn Transform>> {
        let settings: TransformSettings = parse_settings(unit)?;
        let processors = Registry::build_processors(&settings.processors)?;

        LOGGER.log(
            LogLevel::Debug,
            &format!(
                "Built process transform with {} processors: {}",
                processors.len(),
                processors
                    .iter()
                    .map(|p| p.name())
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
            "transform::process",
        );

        Ok(Arc::new(Self::new(processors)))
    }
}

#[async_trait]
impl Transform for ProcessTransform {
    async fn transform(
        &self,
        input: &SharedReceiver,
        output: &mpsc::Sender<Capsule>,
        kill: &KillSignal,
    ) -> ConduitResult<()> {
        loop {
            let capsule = match receive(input, kill).await {
                Received::Capsule(capsule) => capsule,
                Received::Closed | Received::Killed => return Ok(()),
            };

            for result in apply_all(&self.processors, vec![capsule])? {
                if !emit(output, result, kill).await? {
                    return Ok(());
                }
            }
        }
    }

    fn name(&self) -> &str {
        "process"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConduitError;
    use crate::pipeline::signals::{shared, KillSwitch};
    use serde_json::json;

    fn transform(settings: serde_json::Value) -> Arc<dyn Transform> {
        ProcessTransform::build(&UnitConfig::new("process", settings)).unwrap()
    }

    #[tokio::test]
    async fn test_applies_processors_in_order() {
        let transform = transform(json!({
            "processors": [
                {"type": "math", "settings": {"options": {"operation": "add"}, "input_key": "math", "output_key": "sum"}},
                {"type": "copy", "settings": {"input_key": "sum", "output_key": "copy"}}
            ]
        }));

        let (in_tx, in_rx) = mpsc::channel(4);
        let (out_tx, mut out_rx) = mpsc::channel(4);
        in_tx.send(Capsule::new(json!({"math": [1, 3]}))).await.unwrap();
        drop(in_tx);

        let (_switch, kill) = KillSwitch::new();
        transform.transform(&shared(in_rx), &out_tx, &kill).await.unwrap();

        let capsule = out_rx.recv().await.unwrap();
        assert_eq!(capsule.data(), &json!({"math": [1, 3], "sum": 4, "copy": 4}));
    }

    #[tokio::test]
    async fn test_processor_error_ends_transform() {
        let transform = transform(json!({
            "processors": [
                {"type": "math", "settings": {"options": {"operation": "divide"}, "input_key": "n", "output_key": "n"}}
            ]
        }));

        let (in_tx, in_rx) = mpsc::channel(4);
        let (out_tx, mut out_rx) = mpsc::channel(4);
        in_tx.send(Capsule::new(json!({"n": [4, 2]}))).await.unwrap();
        in_tx.send(Capsule::new(json!({"n": [4, 0]}))).await.unwrap();
        in_tx.send(Capsule::new(json!({"n": [9, 3]}))).await.unwrap();
        drop(in_tx);

        let (_switch, kill) = KillSwitch::new();
        let result = transform.transform(&shared(in_rx), &out_tx, &kill).await;
        assert!(matches!(result, Err(ConduitError::ProcessorFailed { .. })));
        drop(out_tx);

        assert_eq!(out_rx.recv().await.unwrap().get("n"), json!(2));
        assert!(out_rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_kill_leaves_queued_capsules() {
        let transform = transform(json!({"processors": []}));

        let (in_tx, in_rx) = mpsc::channel(4);
        let (out_tx, mut out_rx) = mpsc::channel(4);
        in_tx.send(Capsule::new(json!(1))).await.unwrap();
        in_tx.send(Capsule::new(json!(2))).await.unwrap();

        let (switch, kill) = KillSwitch::new();
        switch.fire();

        tokio::time::timeout(
            std::time::Duration::from_secs(1),
            transform.transform(&shared(in_rx), &out_tx, &kill),
        )
        .await
        .unwrap()
        .unwrap();
        drop(out_tx);

        assert!(out_rx.recv().await.is_none());
    }
}
