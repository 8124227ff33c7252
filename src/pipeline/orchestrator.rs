use super::context::RunContext;
use super::signals::{shared, CompletionNotice, KillSwitch, SharedReceiver};
use super::stage::{ProcessingStage, SinkStage, StageOutcome};
use crate::capsule::Capsule;
use crate::config::PipelineConfig;
use crate::error::{ConduitError, ConduitResult};
use crate::logger::{LogLevel, LOGGER};
use crate::registry::Registry;
use crate::sink::Sink;
use crate::transform::Transform;
use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use uuid::Uuid;

const SOURCE: &str = "pipeline::orchestrator";

/// Owns the queues and signals of one pipeline run
///
/// Data flows caller → input queue → N processing workers → output queue → one sink
/// worker, and the caller blocks in [`Orchestrator::join`] until the run ends.
///
/// # Example
/// ```no_run
/// use conduit_lib::capsule::Capsule;
/// use conduit_lib::config::PipelineConfig;
/// use conduit_lib::pipeline::Orchestrator;
/// use serde_json::json;
/// use std::time::Duration;
///
/// # async fn run() -> conduit_lib::error::ConduitResult<()> {
/// let config = PipelineConfig::from_json(
///     r#"{"transform": {"type": "transfer"}, "sink": {"type": "stdout"}}"#,
/// )?;
///
/// let mut orchestrator = Orchestrator::initialize(16);
/// orchestrator.launch(&config, 4)?;
/// orchestrator.submit(Capsule::new(json!({"math": [1, 3]}))).await?;
/// orchestrator.signal_input_done()?;
/// orchestrator.signal_output_done()?;
///
/// let outcome = orchestrator.join(Duration::from_secs(30)).await;
/// orchestrator.signal_kill()?;
/// orchestrator.shutdown().await;
/// outcome
/// # }
/// ```
pub struct Orchestrator {
    context: RunContext,
    kill: Option<KillSwitch>,

    input: Option<mpsc::Sender<Capsule>>,
    input_rx: Option<SharedReceiver>,

    output: Option<mpsc::Sender<Capsule>>,
    output_rx: Option<mpsc::Receiver<Capsule>>,

    errors: Option<mpsc::Receiver<ConduitError>>,
    completion: Option<CompletionNotice>,
    completed: Option<oneshot::Receiver<()>>,

    workers: Vec<JoinHandle<StageOutcome>>,
}

impl Orchestrator {
    /// Allocate the queues and signals for a run. Every queue holds `buffer_size`
    /// items (at least one).
    pub fn initialize(buffer_size: usize) -> Self {
        let buffer_size = buffer_size.max(1);
        let (input, input_rx) = mpsc::channel(buffer_size);
        let (output, output_rx) = mpsc::channel(buffer_size);
        let (errors_tx, errors) = mpsc::channel(buffer_size);
        let (kill, kill_signal) = KillSwitch::new();
        let (completion, completed) = CompletionNotice::new();

        let run_id = Uuid::new_v4();
        LOGGER.log(
            LogLevel::Debug,
            &format!("Initialized run {} (buffer size {})", run_id, buffer_size),
            SOURCE,
        );

        Self {
            context: RunContext::new(run_id, kill_signal, errors_tx),
            kill: Some(kill),
            input: Some(input),
            input_rx: Some(shared(input_rx)),
            output: Some(output),
            output_rx: Some(output_rx),
            errors: Some(errors),
            completion: Some(completion),
            completed: Some(completed),
            workers: Vec::new(),
        }
    }

    pub fn run_id(&self) -> Uuid {
        self.context.run_id()
    }

    /// A copy of the run context, for externally managed workers
    pub fn context(&self) -> RunContext {
        self.context.clone()
    }

    /// Enqueue one capsule, waiting while the input queue is full
    pub async fn submit(&self, capsule: Capsule) -> ConduitResult<()> {
        let input = self
            .input
            .as_ref()
            .ok_or(ConduitError::QueueClosed("input"))?;
        let kill = self.context.kill();

        tokio::select! {
            biased;
            _ = kill.raised() => Err(ConduitError::Cancelled),
            sent = input.send(capsule) => sent.map_err(|_| ConduitError::QueueClosed("input")),
        }
    }

    /// Queue an error for `join` without blocking
    pub fn report_error(&self, err: ConduitError) {
        self.context.report_error(err);
    }

    /// Raise `kill`. Only the first call has an effect.
    pub fn signal_kill(&mut self) -> ConduitResult<()> {
        let switch = self
            .kill
            .take()
            .ok_or(ConduitError::SignalAlreadyRaised("kill"))?;
        LOGGER.log(
            LogLevel::Debug,
            &format!("Kill signal raised (run: {})", self.run_id()),
            SOURCE,
        );
        switch.fire();
        Ok(())
    }

    /// Close the input queue; workers drain what is queued before finishing
    pub fn signal_input_done(&mut self) -> ConduitResult<()> {
        self.input
            .take()
            .ok_or(ConduitError::SignalAlreadyRaised("input_done"))?;
        LOGGER.log(
            LogLevel::Debug,
            &format!("Input queue closed (run: {})", self.run_id()),
            SOURCE,
        );
        Ok(())
    }

    /// Release the orchestrator's hold on the output queue.
    ///
    /// The sink observes closure once every processing worker has also finished, so
    /// completion can never be raised while a worker might still send.
    pub fn signal_output_done(&mut self) -> ConduitResult<()> {
        self.output
            .take()
            .ok_or(ConduitError::SignalAlreadyRaised("output_done"))?;
        LOGGER.log(
            LogLevel::Debug,
            &format!("Output queue released (run: {})", self.run_id()),
            SOURCE,
        );
        Ok(())
    }

    /// Build the configured units and start the workers.
    ///
    /// Every unit is built before anything is spawned, so a bad descriptor fails the run
    /// before a single capsule is processed.
    pub fn launch(&mut self, config: &PipelineConfig, concurrency: usize) -> ConduitResult<()> {
        if self.completion.is_none() {
            return Err(ConduitError::SignalAlreadyRaised("launch"));
        }

        let transform = Registry::build_transform(&config.transform)?;
        let sink = Registry::build_sink(&config.sink)?;
        self.launch_units(transform, sink, concurrency)
    }

    /// Start workers for units built outside the registry
    pub fn launch_units(
        &mut self,
        transform: Arc<dyn Transform>,
        sink: Box<dyn Sink>,
        concurrency: usize,
    ) -> ConduitResult<()> {
        if self.completion.is_none() {
            return Err(ConduitError::SignalAlreadyRaised("launch"));
        }
        let output = self
            .output
            .clone()
            .ok_or(ConduitError::QueueClosed("output"))?;
        let (Some(completion), Some(input_rx), Some(output_rx)) = (
            self.completion.take(),
            self.input_rx.take(),
            self.output_rx.take(),
        ) else {
            return Err(ConduitError::Internal("queues already handed out".into()));
        };

        let concurrency = concurrency.max(1);
        LOGGER.log(
            LogLevel::Info,
            &format!(
                "Launching {} '{}' workers and sink '{}' (run: {})",
                concurrency,
                transform.name(),
                sink.name(),
                self.run_id()
            ),
            SOURCE,
        );

        for worker in 0..concurrency {
            let stage = ProcessingStage::new(
                worker,
                transform.clone(),
                input_rx.clone(),
                output.clone(),
                self.context.clone(),
            );
            self.workers.push(tokio::spawn(stage.run()));
        }

        let stage = SinkStage::new(sink, output_rx, completion, self.context.clone());
        self.workers.push(tokio::spawn(stage.run()));
        Ok(())
    }

    /// Wait for the first of: a reported error, completion, or `deadline`.
    ///
    /// Errors win when several are ready at once. Can only be called once; the caller
    /// is expected to raise `kill` afterwards.
    pub async fn join(&mut self, deadline: Duration) -> ConduitResult<()> {
        let (Some(mut errors), Some(mut completed)) = (self.errors.take(), self.completed.take())
        else {
            return Err(ConduitError::SignalAlreadyRaised("join"));
        };

        let outcome = tokio::select! {
            biased;
            Some(err) = errors.recv() => Err(err),
            notice = &mut completed => match notice {
                Ok(()) => Ok(()),
                Err(_) => Err(self.sink_ended_early(&mut errors)),
            },
            _ = tokio::time::sleep(deadline) => Err(ConduitError::DeadlineExceeded(deadline)),
        };

        match &outcome {
            Ok(()) => LOGGER.log(
                LogLevel::Info,
                &format!("Run {} completed", self.run_id()),
                SOURCE,
            ),
            Err(e) => LOGGER.log(
                LogLevel::Error,
                &format!("Run {} failed: {}", self.run_id(), e),
                SOURCE,
            ),
        }
        outcome
    }

    /// The completion notice was dropped unraised
    fn sink_ended_early(&self, errors: &mut mpsc::Receiver<ConduitError>) -> ConduitError {
        if let Ok(err) = errors.try_recv() {
            return err;
        }
        if self.context.kill().is_raised() {
            return ConduitError::Cancelled;
        }
        ConduitError::StageAborted("sink ended without raising completion".into())
    }

    /// Raise `kill` if still held and wait for every worker to stop
    pub async fn shutdown(mut self) {
        if let Some(switch) = self.kill.take() {
            switch.fire();
        }

        let outcomes = join_all(self.workers.drain(..)).await;
        let panicked = outcomes.iter().filter(|o| o.is_err()).count();
        if panicked > 0 {
            LOGGER.log(
                LogLevel::Error,
                &format!("{} workers panicked (run: {})", panicked, self.run_id()),
                SOURCE,
            );
        }
        LOGGER.log(
            LogLevel::Debug,
            &format!("Run {} shut down", self.run_id()),
            SOURCE,
        );
    }
}

impl Drop for Orchestrator {
    fn drop(&mut self) {
        if let Some(switch) = self.kill.take() {
            switch.fire();
        }
    }
}
