//! streamstat - windowed reports over a live post stream
//!
//! Usage:
//!   cargo run --release --bin streamstat
//!
//! Environment variables (also read from `.env` and `streamstat.config`):
//!   TOTAL_RUN_SECS, INTERVAL_SECS, REPORT_SINK - asked for when missing and stdin is a terminal
//!   STREAM_SOURCE - http (default) or replay
//!   STREAM_URL, STREAM_BEARER_TOKEN - http source
//!   REPLAY_PATH, REPLAY_PACE_MS - replay source
//!   RUST_LOG - log filter (default: info)

use dotenv::dotenv;
use log::{error, info, warn};
use std::io::{self, IsTerminal};
use streamstat::aggregator_core::{build_sink, report_sink_task};
use streamstat::config::{load_settings_file, Prompter, SessionConfig, SourceConfig};
use streamstat::pipeline::{IngestionSupervisor, SupervisorSettings};
use streamstat::streamer_core::build_source;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

const REPORT_CHANNEL_CAPACITY: usize = 64;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stderr)
        .init();

    load_settings_file();

    info!("🚀 Starting streamstat...");

    let session_config = if io::stdin().is_terminal() {
        let stdin = io::stdin();
        let mut prompter = Prompter::new(stdin.lock(), io::stdout());
        SessionConfig::from_env(Some(&mut prompter))?
    } else {
        SessionConfig::from_env(None)?
    };
    let source_config = SourceConfig::from_env()?;

    info!("📊 Configuration:");
    info!("   ├─ Total run: {}s", session_config.total_run.as_secs());
    info!("   ├─ Interval: {}s", session_config.interval.as_secs());
    info!("   ├─ Windows: {}", session_config.window_count());
    info!("   ├─ Sink: {:?}", session_config.sink);
    info!("   └─ Top-K: {}", session_config.top_k);

    let source = build_source(&source_config)?;
    let sink = build_sink(session_config.sink, &session_config.output_dir)?;

    let (report_tx, report_rx) = mpsc::channel(REPORT_CHANNEL_CAPACITY);
    let sink_handle = tokio::spawn(report_sink_task(report_rx, sink));

    let session = CancellationToken::new();
    let interrupt = session.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("🛑 Interrupt received, closing open windows...");
            interrupt.cancel();
        }
    });

    let supervisor = IngestionSupervisor::new(SupervisorSettings::from(&session_config));
    let outcome = supervisor.run(source, session, report_tx).await;

    let delivered = sink_handle.await?;

    match outcome {
        Ok(summary) => {
            info!("✅ Session complete");
            info!("   ├─ Windows scheduled: {}", summary.windows_scheduled);
            info!("   ├─ Reports delivered: {}", delivered);
            info!("   ├─ Events ingested: {}", summary.events_ingested);
            info!("   ├─ Events unclaimed: {}", summary.events_unclaimed);
            info!("   └─ Source errors: {}", summary.source_errors);
            Ok(())
        }
        Err(e) => {
            error!("❌ Session failed: {}", e);
            Err(e.into())
        }
    }
}
