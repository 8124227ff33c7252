//! Worker drivers for the processing and sink stages
//!
//! Drivers own the unit they run, report failures through the run context, and treat
//! `kill` as a silent stop.

use super::context::RunContext;
use super::signals::{CompletionNotice, SharedReceiver};
use crate::capsule::Capsule;
use crate::error::ConduitError;
use crate::logger::{LogLevel, LOGGER};
use crate::sink::Sink;
use crate::transform::Transform;
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;

/// How a stage driver ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageOutcome {
    /// Input closed and drained; for the sink, completion was raised
    Drained,
    /// Stopped by `kill`
    Killed,
    /// The unit failed and the error was reported
    Failed,
}

/// One processing worker. Several may share the same queues.
pub struct ProcessingStage {
    worker: usize,
    transform: Arc<dyn Transform>,
    input: SharedReceiver,
    output: mpsc::Sender<Capsule>,
    context: RunContext,
}

impl ProcessingStage {
    pub fn new(
        worker: usize,
        transform: Arc<dyn Transform>,
        input: SharedReceiver,
        output: mpsc::Sender<Capsule>,
        context: RunContext,
    ) -> Self {
        Self {
            worker,
            transform,
            input,
            output,
            context,
        }
    }

    /// Run until the input queue is closed and drained, `kill` is raised, or the
    /// transform fails. Failures go to the run's error queue.
    ///
    /// A panicking transform is reported as [`ConduitError::StageAborted`] while this
    /// stage still holds its output sender, so the sink cannot complete ahead of the error.
    pub async fn run(self) -> StageOutcome {
        let start = Instant::now();
        let kill = self.context.kill();

        LOGGER.log(
            LogLevel::Debug,
            &format!(
                "Worker {} starting transform '{}' (run: {})",
                self.worker,
                self.transform.name(),
                self.context.run_id()
            ),
            "pipeline::stage",
        );

        let result = AssertUnwindSafe(self.transform.transform(&self.input, &self.output, kill))
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| {
                Err(ConduitError::StageAborted(format!(
                    "worker {} transform '{}' panicked: {}",
                    self.worker,
                    self.transform.name(),
                    panic_message(&*panic)
                )))
            });

        match result {
            Ok(()) if kill.is_raised() => {
                LOGGER.log(
                    LogLevel::Debug,
                    &format!("Worker {} stopped by kill signal", self.worker),
                    "pipeline::stage",
                );
                StageOutcome::Killed
            }
            Ok(()) => {
                LOGGER.log(
                    LogLevel::Debug,
                    &format!(
                        "Worker {} drained input in {:?}",
                        self.worker,
                        start.elapsed()
                    ),
                    "pipeline::stage",
                );
                StageOutcome::Drained
            }
            Err(e) => {
                LOGGER.log(
                    LogLevel::Error,
                    &format!(
                        "Worker {} transform '{}' failed: {}",
                        self.worker,
                        self.transform.name(),
                        e
                    ),
                    "pipeline::stage",
                );
                self.context.report_error(e);
                StageOutcome::Failed
            }
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(message) = panic.downcast_ref::<&str>() {
        *message
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.as_str()
    } else {
        "unknown panic"
    }
}

/// The single sink worker; the only stage allowed to raise completion
pub struct SinkStage {
    sink: Box<dyn Sink>,
    output: mpsc::Receiver<Capsule>,
    completion: CompletionNotice,
    context: RunContext,
}

impl SinkStage {
    pub fn new(
        sink: Box<dyn Sink>,
        output: mpsc::Receiver<Capsule>,
        completion: CompletionNotice,
        context: RunContext,
    ) -> Self {
        Self {
            sink,
            output,
            completion,
            context,
        }
    }

    /// Deliver until the output queue is closed and drained, flush, then raise
    /// completion. `kill` and delivery errors end the stage without completing.
    pub async fn run(mut self) -> StageOutcome {
        let kill = self.context.kill().clone();
        let mut delivered = 0usize;

        loop {
            let next = tokio::select! {
                biased;
                _ = kill.raised() => {
                    LOGGER.log(
                        LogLevel::Debug,
                        &format!("Sink '{}' stopped by kill signal", self.sink.name()),
                        "pipeline::stage",
                    );
                    return StageOutcome::Killed;
                }
                next = self.output.recv() => next,
            };

            let Some(capsule) = next else { break };
            if let Err(e) = self.sink.send(capsule).await {
                return self.fail(e);
            }
            delivered += 1;
        }

        if let Err(e) = self.sink.flush().await {
            return self.fail(e);
        }

        LOGGER.log(
            LogLevel::Debug,
            &format!(
                "Sink '{}' delivered {} capsules, raising completion (run: {})",
                self.sink.name(),
                delivered,
                self.context.run_id()
            ),
            "pipeline::stage",
        );
        self.completion.raise();
        StageOutcome::Drained
    }

    /// Reports the error while the completion notice is still held, so `join` sees the
    /// error before the notice is dropped
    fn fail(self, e: ConduitError) -> StageOutcome {
        LOGGER.log(
            LogLevel::Error,
            &format!("Sink '{}' failed: {}", self.sink.name(), e),
            "pipeline::stage",
        );
        self.context.report_error(e);
        StageOutcome::Failed
    }
}
