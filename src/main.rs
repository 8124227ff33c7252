use clap::Parser;
use conduit_lib::config::{PipelineConfig, RunConfig};
use conduit_lib::error::ConduitResult;
use conduit_lib::logger::{init_tracing, LogLevel, LOGGER};
use conduit_lib::pipeline::execute;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tokio::io::BufReader;

/// Conduit - run one streaming pipeline over newline-delimited records on stdin
#[derive(Parser)]
#[command(name = "conduit")]
#[command(about = "Run a single streaming transformation pipeline", long_about = None)]
struct Cli {
    /// Path to the pipeline configuration file (JSON)
    #[arg(long, value_name = "FILE")]
    config: PathBuf,

    /// Seconds to wait for the run to finish
    #[arg(long, default_value_t = 300)]
    timeout: u64,

    /// Log level: debug, info, warn or error (RUST_LOG overrides)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Write the most recent log entries, debug included, to FILE as JSON lines if the
    /// run fails
    #[arg(long, value_name = "FILE")]
    log_dump: Option<PathBuf>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    // the dump keeps debug entries even when stderr shows less
    let retained = match cli.log_dump {
        Some(_) => Some(LogLevel::Debug),
        None => LogLevel::parse(&cli.log_level),
    };
    if let Some(level) = retained {
        LOGGER.set_min_level(level);
    }

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("conduit: failed to start runtime: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let result = runtime.block_on(run(&cli));

    // A stdin read still parked on the blocking pool must not hold the process open
    // once the deadline has passed.
    runtime.shutdown_background();

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("conduit: {}", e);
            if let Some(path) = &cli.log_dump {
                match LOGGER.dump(path) {
                    Ok(count) => eprintln!("conduit: wrote {} log entries to {}", count, path.display()),
                    Err(dump_err) => eprintln!("conduit: failed to write log dump: {}", dump_err),
                }
            }
            if e.is_configuration() {
                ExitCode::from(2)
            } else {
                ExitCode::FAILURE
            }
        }
    }
}

async fn run(cli: &Cli) -> ConduitResult<()> {
    let config = PipelineConfig::from_file(&cli.config)?;
    let settings = RunConfig::from_env()?;
    let deadline = Duration::from_secs(cli.timeout);

    let stdin = BufReader::new(tokio::io::stdin());
    execute(&config, &settings, stdin, deadline).await
}
