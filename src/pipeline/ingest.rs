use super::orchestrator::Orchestrator;
use crate::capsule::Capsule;
use crate::config::ScanMethod;
use crate::error::ConduitResult;
use crate::logger::{LogLevel, LOGGER};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

/// Submit one capsule per newline-framed record, then close the input queue.
///
/// Blank lines are skipped and a trailing `\r` is stripped. The input queue is closed
/// even when reading fails part way through.
pub async fn scan<R>(
    reader: R,
    method: ScanMethod,
    orchestrator: &mut Orchestrator,
) -> ConduitResult<usize>
where
    R: AsyncBufRead + Unpin,
{
    let result = submit_records(reader, method, orchestrator).await;
    orchestrator.signal_input_done()?;

    let submitted = result?;
    LOGGER.log(
        LogLevel::Debug,
        &format!(
            "Submitted {} records (run: {})",
            submitted,
            orchestrator.run_id()
        ),
        "pipeline::ingest",
    );
    Ok(submitted)
}

async fn submit_records<R>(
    mut reader: R,
    method: ScanMethod,
    orchestrator: &Orchestrator,
) -> ConduitResult<usize>
where
    R: AsyncBufRead + Unpin,
{
    let mut submitted = 0;
    let mut record = Vec::new();
    loop {
        record.clear();
        if reader.read_until(b'\n', &mut record).await? == 0 {
            return Ok(submitted);
        }

        let mut bytes = record.as_slice();
        if let Some(rest) = bytes.strip_suffix(b"\n") {
            bytes = rest;
        }
        if let Some(rest) = bytes.strip_suffix(b"\r") {
            bytes = rest;
        }
        if bytes.iter().all(u8::is_ascii_whitespace) {
            continue;
        }

        orchestrator
            .submit(Capsule::from_record(bytes, method))
            .await?;
        submitted += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConduitError;
    use serde_json::json;

    #[tokio::test]
    async fn test_scan_frames_records() {
        let input: &[u8] = b"{\"a\":1}\r\n\n  \nplain text\nlast";
        let mut orchestrator = Orchestrator::initialize(8);

        let submitted = scan(input, ScanMethod::Text, &mut orchestrator)
            .await
            .unwrap();
        assert_eq!(submitted, 3);

        // the input queue is closed exactly once
        assert!(matches!(
            orchestrator.signal_input_done(),
            Err(ConduitError::SignalAlreadyRaised(_))
        ));
        assert!(matches!(
            orchestrator.submit(Capsule::new(json!(1))).await,
            Err(ConduitError::QueueClosed("input"))
        ));
    }
}
