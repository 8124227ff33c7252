use super::signals::KillSignal;
use crate::error::ConduitError;
use crate::logger::{LogLevel, LOGGER};
use tokio::sync::mpsc::{self, error::TrySendError};
use uuid::Uuid;

/// Run-scoped state handed to every worker
///
/// Holds the run id used in log lines, the `kill` observer, and the writing end of the
/// error queue. Cloning is cheap; every worker gets its own copy.
#[derive(Debug, Clone)]
pub struct RunContext {
    run_id: Uuid,
    kill: KillSignal,
    errors: mpsc::Sender<ConduitError>,
}

impl RunContext {
    pub fn new(run_id: Uuid, kill: KillSignal, errors: mpsc::Sender<ConduitError>) -> Self {
        Self {
            run_id,
            kill,
            errors,
        }
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn kill(&self) -> &KillSignal {
        &self.kill
    }

    /// Report an error without ever blocking.
    ///
    /// Returns `false` when the error could not be queued: the queue is full, or the
    /// run has already been joined.
    pub fn report_error(&self, err: ConduitError) -> bool {
        match self.errors.try_send(err) {
            Ok(()) => true,
            Err(TrySendError::Full(err)) => {
                LOGGER.log(
                    LogLevel::Warn,
                    &format!("Error queue full, dropping error (run: {}): {}", self.run_id, err),
                    "pipeline::context",
                );
                false
            }
            Err(TrySendError::Closed(err)) => {
                LOGGER.log(
                    LogLevel::Debug,
                    &format!("Run already joined, dropping error (run: {}): {}", self.run_id, err),
                    "pipeline::context",
                );
                false
            }
        }
    }
}
