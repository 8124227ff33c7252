use crate::error::ConduitResult;
use chrono::{DateTime, Utc};
use crossbeam_channel::{bounded, Receiver, Sender};
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

/// Log level enum for type-safe logging
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug = 0,
    Info = 1,
    Warn = 2,
    Error = 3,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "debug" => Some(LogLevel::Debug),
            "info" => Some(LogLevel::Info),
            "warn" => Some(LogLevel::Warn),
            "error" => Some(LogLevel::Error),
            _ => None,
        }
    }
}

/// Log entry retained for the post-mortem dump of a failed run
#[derive(Debug, Clone, Serialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub message: String,
    pub source: &'static str, // module path, e.g. "pipeline::stage"
}

/// Fixed-size ring of the most recent entries
struct CircularBuffer {
    buffer: Vec<LogEntry>,
    head: usize,
    size: usize,
    capacity: usize,
}

impl CircularBuffer {
    fn new(capacity: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(capacity),
            head: 0,
            size: 0,
            capacity,
        }
    }

    fn push(&mut self, item: LogEntry) {
        if self.size < self.capacity {
            self.buffer.push(item);
            self.size += 1;
        } else {
            self.buffer[self.head] = item;
            self.head = (self.head + 1) % self.capacity;
        }
    }

    fn to_vec(&self) -> Vec<LogEntry> {
        if self.size < self.capacity {
            self.buffer.clone()
        } else {
            // Oldest first
            let mut result = Vec::with_capacity(self.size);
            result.extend_from_slice(&self.buffer[self.head..]);
            result.extend_from_slice(&self.buffer[..self.head]);
            result
        }
    }
}

/// Commands for the logger thread
enum LogCommand {
    Log(LogEntry),
    GetLogs(Sender<Vec<LogEntry>>),
}

pub struct Logger {
    sender: Sender<LogCommand>,
    min_level: Arc<AtomicU8>,
}

impl Logger {
    pub fn new() -> Self {
        Self::with_capacity(1000)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, receiver) = bounded(capacity.max(1));
        let min_level = Arc::new(AtomicU8::new(LogLevel::Debug as u8));

        std::thread::spawn(move || {
            Self::logger_thread(receiver, capacity.max(1));
        });

        Self { sender, min_level }
    }

    /// Background thread that owns the ring buffer
    fn logger_thread(receiver: Receiver<LogCommand>, capacity: usize) {
        let mut buffer = CircularBuffer::new(capacity);

        for cmd in receiver {
            match cmd {
                LogCommand::Log(entry) => {
                    buffer.push(entry);
                }
                LogCommand::GetLogs(response_tx) => {
                    let _ = response_tx.send(buffer.to_vec());
                }
            }
        }
    }

    /// Log with enum level (non-blocking)
    pub fn log(&self, level: LogLevel, message: &str, source: &'static str) {
        if (level as u8) < self.min_level.load(Ordering::Relaxed) {
            return;
        }

        match level {
            LogLevel::Error => tracing::error!(source = source, "{}", message),
            LogLevel::Warn => tracing::warn!(source = source, "{}", message),
            LogLevel::Info => tracing::info!(source = source, "{}", message),
            LogLevel::Debug => tracing::debug!(source = source, "{}", message),
        }

        let entry = LogEntry {
            timestamp: Utc::now(),
            level,
            message: message.to_string(),
            source,
        };

        // Drops the entry if the channel is full
        let _ = self.sender.try_send(LogCommand::Log(entry));
    }

    /// Set minimum log level (runtime filtering)
    pub fn set_min_level(&self, level: LogLevel) {
        self.min_level.store(level as u8, Ordering::Relaxed);
    }

    /// Retained entries, oldest first
    pub fn get_logs(&self) -> Vec<LogEntry> {
        let (response_tx, response_rx) = bounded(1);
        if self.sender.send(LogCommand::GetLogs(response_tx)).is_ok() {
            response_rx.recv().unwrap_or_default()
        } else {
            Vec::new()
        }
    }

    /// Write the retained entries to `path` as JSON lines, returning how many were written
    pub fn dump(&self, path: &Path) -> ConduitResult<usize> {
        let entries = self.get_logs();
        let mut writer = BufWriter::new(File::create(path)?);
        for entry in &entries {
            serde_json::to_writer(&mut writer, entry)?;
            writer.write_all(b"\n")?;
        }
        writer.flush()?;
        Ok(entries.len())
    }
}

impl Default for Logger {
    fn default() -> Self {
        Self::new()
    }
}

// Global logger instance
lazy_static::lazy_static! {
    pub static ref LOGGER: Logger = Logger::new();
}

/// Install the process-wide tracing subscriber.
///
/// `RUST_LOG` takes precedence over `default_directive`. Calling this more than once is
/// harmless; only the first subscriber is installed.
pub fn init_tracing(default_directive: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_directive));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .compact()
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_round_trip() {
        for level in [LogLevel::Debug, LogLevel::Info, LogLevel::Warn, LogLevel::Error] {
            assert_eq!(LogLevel::parse(level.as_str()), Some(level));
        }
        assert_eq!(LogLevel::parse("verbose"), None);
    }

    #[test]
    fn test_circular_buffer_keeps_latest() {
        let mut buffer = CircularBuffer::new(2);
        for message in ["one", "two", "three"] {
            buffer.push(LogEntry {
                timestamp: Utc::now(),
                level: LogLevel::Info,
                message: message.to_string(),
                source: "test",
            });
        }

        let messages: Vec<String> = buffer.to_vec().into_iter().map(|e| e.message).collect();
        assert_eq!(messages, vec!["two", "three"]);
    }

    #[test]
    fn test_logger_filters_below_min_level() {
        let logger = Logger::with_capacity(16);
        logger.set_min_level(LogLevel::Warn);
        logger.log(LogLevel::Info, "ignored", "test");
        logger.log(LogLevel::Error, "kept", "test");

        let logs = logger.get_logs();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].message, "kept");
    }

    #[test]
    fn test_dump_writes_json_lines() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("conduit-log.jsonl");

        let logger = Logger::with_capacity(16);
        logger.log(LogLevel::Debug, "worker 0 starting", "pipeline::stage");
        logger.log(LogLevel::Error, "sink 'file' failed", "pipeline::stage");

        assert_eq!(logger.dump(&path).unwrap(), 2);
        let lines: Vec<serde_json::Value> = std::fs::read_to_string(&path)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(lines[0]["level"], "debug");
        assert_eq!(lines[1]["message"], "sink 'file' failed");
        assert_eq!(lines[1]["source"], "pipeline::stage");
    }
}
