use super::{line, Sink};
use crate::capsule::Capsule;
use crate::config::UnitConfig;
use crate::error::{ConduitError, ConduitResult};
use crate::logger::{LogLevel, LOGGER};
use crate::registry::parse_settings;
use async_trait::async_trait;
use serde::Deserialize;
use std::path::PathBuf;
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FileSettings {
    #[serde(default)]
    pub path: Option<PathBuf>,
}

/// Writes each capsule as a line to a local file
///
/// The file is created (or truncated) on the first send, or at flush when nothing was
/// sent, so an empty run still leaves an empty file behind.
pub struct FileSink {
    path: PathBuf,
    writer: Option<BufWriter<File>>,
    written: usize,
}

impl FileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            writer: None,
            written: 0,
        }
    }

    pub fn build(unit: &UnitConfig) -> ConduitResult<Box<dyn Sink>> {
        let settings: FileSettings = parse_settings(unit)?;
        let path = settings
            .path
            .filter(|p| !p.as_os_str().is_empty())
            .ok_or_else(|| ConduitError::missing_option(&unit.unit_type, "path"))?;
        Ok(Box::new(Self::new(path)))
    }

    async fn writer(&mut self) -> ConduitResult<&mut BufWriter<File>> {
        if self.writer.is_none() {
            let file = File::create(&self.path)
                .await
                .map_err(|e| self.failure(format!("create {}: {}", self.path.display(), e)))?;
            self.writer = Some(BufWriter::new(file));
        }
        self.writer
            .as_mut()
            .ok_or_else(|| ConduitError::Internal("file sink writer missing".into()))
    }

    fn failure(&self, reason: impl ToString) -> ConduitError {
        ConduitError::delivery_failed("file", reason)
    }
}

#[async_trait]
impl Sink for FileSink {
    async fn send(&mut self, capsule: Capsule) -> ConduitResult<()> {
        let bytes = line(&capsule);
        let result = self.writer().await?.write_all(bytes.as_bytes()).await;
        result.map_err(|e| self.failure(e))?;
        self.written += 1;
        Ok(())
    }

    async fn flush(&mut self) -> ConduitResult<()> {
        let result = self.writer().await?.flush().await;
        result.map_err(|e| self.failure(e))?;

        LOGGER.log(
            LogLevel::Debug,
            &format!("Wrote {} records to {}", self.written, self.path.display()),
            "sink::file",
        );
        Ok(())
    }

    fn name(&self) -> &str {
        "file"
    }
}
