//! Sinks deliver capsules to an external destination
//!
//! Line-oriented sinks write one record per line: string payloads raw, anything else as
//! compact JSON.

pub mod file;
pub mod stdout;

pub use file::FileSink;
pub use stdout::StdoutSink;

use crate::capsule::Capsule;
use crate::error::ConduitResult;
use async_trait::async_trait;

#[async_trait]
pub trait Sink: Send {
    /// Deliver one capsule
    async fn send(&mut self, capsule: Capsule) -> ConduitResult<()>;

    /// Flush buffered output; called once after the output queue is drained
    async fn flush(&mut self) -> ConduitResult<()> {
        Ok(())
    }

    /// Registered type name, for logging
    fn name(&self) -> &str;
}

/// Frame a capsule as one output line, newline included
pub(crate) fn line(capsule: &Capsule) -> String {
    let mut line = capsule.to_line();
    line.push('\n');
    line
}
