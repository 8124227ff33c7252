use super::{line, Sink};
use crate::capsule::Capsule;
use crate::config::UnitConfig;
use crate::error::{ConduitError, ConduitResult};
use async_trait::async_trait;
use tokio::io::{AsyncWriteExt, BufWriter, Stdout};

/// Writes each capsule as a line on standard output
pub struct StdoutSink {
    writer: BufWriter<Stdout>,
}

impl StdoutSink {
    pub fn new() -> Self {
        Self {
            writer: BufWriter::new(tokio::io::stdout()),
        }
    }

    pub fn build(unit: &UnitConfig) -> ConduitResult<Box<dyn Sink>> {
        unit.resolved_settings()?;
        Ok(Box::new(Self::new()))
    }
}

impl Default for StdoutSink {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Sink for StdoutSink {
    async fn send(&mut self, capsule: Capsule) -> ConduitResult<()> {
        self.writer
            .write_all(line(&capsule).as_bytes())
            .await
            .map_err(|e| ConduitError::delivery_failed("stdout", e))
    }

    async fn flush(&mut self) -> ConduitResult<()> {
        self.writer
            .flush()
            .await
            .map_err(|e| ConduitError::delivery_failed("stdout", e))
    }

    fn name(&self) -> &str {
        "stdout"
    }
}
