use super::{emit, receive, Received, Transform};
use crate::capsule::Capsule;
use crate::config::UnitConfig;
use crate::error::ConduitResult;
use crate::pipeline::signals::{KillSignal, SharedReceiver};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Forwards capsules unchanged
#[derive(Debug, Clone, Default)]
pub struct Transfer;

impl Transfer {
    pub fn build(unit: &UnitConfig) -> ConduitResult<Arc<dyn Transform>> {
        unit.resolved_settings()?;
        Ok(Arc::new(Self))
    }
}

#[async_trait]
impl Transform for Transfer {
    async fn transform(
        &self,
        input: &SharedReceiver,
        output: &mpsc::Sender<Capsule>,
        kill: &KillSignal,
    ) -> ConduitResult<()> {
        loop {
            match receive(input, kill).await {
                Received::Capsule(capsule) => {
                    if !emit(output, capsule, kill).await? {
                        return Ok(());
                    }
                }
                Received::Closed | Received::Killed => return Ok(()),
            }
        }
    }

    fn name(&self) -> &str {
        "transfer"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::signals::{shared, KillSwitch};
    use serde_json::json;

    #[tokio::test]
    async fn test_forwards_in_order() {
        let (in_tx, in_rx) = mpsc::channel(8);
        let (out_tx, mut out_rx) = mpsc::channel(8);
        for i in 0..3 {
            in_tx.send(Capsule::new(json!({"id": i}))).await.unwrap();
        }
        drop(in_tx);

        let (_switch, kill) = KillSwitch::new();
        Transfer.transform(&shared(in_rx), &out_tx, &kill).await.unwrap();
        drop(out_tx);

        let mut ids = Vec::new();
        while let Some(capsule) = out_rx.recv().await {
            ids.push(capsule.get("id"));
        }
        assert_eq!(ids, vec![json!(0), json!(1), json!(2)]);
    }
}
