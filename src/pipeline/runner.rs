use super::ingest::scan;
use super::orchestrator::Orchestrator;
use crate::config::{PipelineConfig, RunConfig};
use crate::error::{ConduitError, ConduitResult};
use std::time::{Duration, Instant};
use tokio::io::AsyncBufRead;

/// Run one pipeline over every record `reader` yields, bounded by `deadline`.
///
/// The deadline covers ingestion as well as the drain, so a reader that never reaches
/// end of input still ends the run with [`ConduitError::DeadlineExceeded`]. Kill is always
/// raised and every worker has stopped by the time this returns.
pub async fn execute<R>(
    config: &PipelineConfig,
    settings: &RunConfig,
    reader: R,
    deadline: Duration,
) -> ConduitResult<()>
where
    R: AsyncBufRead + Unpin,
{
    let started = Instant::now();

    let mut orchestrator = Orchestrator::initialize(settings.buffer_size);
    orchestrator.launch(config, settings.concurrency)?;
    orchestrator.signal_output_done()?;

    match tokio::time::timeout(deadline, scan(reader, settings.scan_method, &mut orchestrator))
        .await
    {
        Ok(Ok(_)) => {}
        // a closed queue means the workers already stopped; join reports why
        Ok(Err(ConduitError::QueueClosed(_))) => {}
        Ok(Err(e)) => orchestrator.report_error(e),
        Err(_) => orchestrator.report_error(ConduitError::DeadlineExceeded(deadline)),
    }

    let outcome = orchestrator
        .join(deadline.saturating_sub(started.elapsed()))
        .await;
    orchestrator.signal_kill()?;
    orchestrator.shutdown().await;
    outcome
}
