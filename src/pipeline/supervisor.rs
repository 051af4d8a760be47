//! Ingestion supervisor - owns one whole reporting session
//!
//! Starts the event source, waits (bounded) until the shared buffer has seen
//! its first entry, schedules every window plus the stream shutdown timer on
//! a single [`TaskScheduler`], then waits for all of them to finish.
//!
//! Cancellation hierarchy:
//!
//! ```text
//! session token (Ctrl-C)
//!   ├─ stream token   (cancelled at total run time)
//!   └─ window tokens  (one per window, cancelled at window end)
//! ```

use super::ingestion::{run_ingestion, IngestBuffer, IngestStats};
use super::scheduler::TaskScheduler;
use super::session::SessionScheduler;
use crate::aggregator_core::Report;
use crate::config::SessionConfig;
use crate::streamer_core::{EventSource, SourceError};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{sleep, Duration, Instant};
use tokio_util::sync::CancellationToken;

#[derive(Debug)]
pub enum SessionError {
    SourceStart(SourceError),
    IngestionNeverStarted { waited: Duration },
    Interrupted,
}

impl std::fmt::Display for SessionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionError::SourceStart(e) => write!(f, "Could not start event source: {}", e),
            SessionError::IngestionNeverStarted { waited } => write!(
                f,
                "No events received within {:.1}s of starting the source",
                waited.as_secs_f64()
            ),
            SessionError::Interrupted => write!(f, "Session interrupted before ingestion started"),
        }
    }
}

impl std::error::Error for SessionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SessionError::SourceStart(e) => Some(e),
            _ => None,
        }
    }
}

impl From<SourceError> for SessionError {
    fn from(err: SourceError) -> Self {
        SessionError::SourceStart(err)
    }
}

/// Outcome of a completed session
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionSummary {
    pub windows_scheduled: usize,
    pub events_ingested: u64,
    /// Entries still in the shared buffer when the session ended
    pub events_unclaimed: u64,
    pub source_errors: u64,
    pub interrupted: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SupervisorSettings {
    pub total: Duration,
    pub window: Duration,
    pub readiness_timeout: Duration,
    pub readiness_poll: Duration,
    pub top_k: usize,
}

impl SupervisorSettings {
    pub fn new(total: Duration, window: Duration) -> Self {
        Self {
            total,
            window,
            readiness_timeout: Duration::from_secs(60),
            readiness_poll: Duration::from_millis(500),
            top_k: crate::aggregator_core::DEFAULT_TOP_K,
        }
    }
}

impl From<&SessionConfig> for SupervisorSettings {
    fn from(config: &SessionConfig) -> Self {
        Self {
            total: config.total_run,
            window: config.interval,
            readiness_timeout: config.readiness_timeout,
            readiness_poll: config.readiness_poll,
            top_k: config.top_k,
        }
    }
}

pub struct IngestionSupervisor {
    settings: SupervisorSettings,
}

impl IngestionSupervisor {
    pub fn new(settings: SupervisorSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &SupervisorSettings {
        &self.settings
    }

    /// Run a whole session against `source`, sending each window's report on
    /// `reports`.
    ///
    /// A source that fails to start, or that delivers nothing before the
    /// readiness timeout, fails the session before any window is scheduled.
    pub async fn run(
        &self,
        mut source: Box<dyn EventSource>,
        session: CancellationToken,
        reports: mpsc::Sender<Report>,
    ) -> Result<SessionSummary, SessionError> {
        log::info!("🚀 Starting {} source", source.source_type());
        source.start().await?;

        let buffer = Arc::new(IngestBuffer::new());
        let stream = session.child_token();
        let mut ingest = tokio::spawn(run_ingestion(source, Arc::clone(&buffer), stream.clone()));

        if let Err(e) = self.await_readiness(&buffer, &ingest, &session).await {
            stream.cancel();
            let _ = (&mut ingest).await;
            return Err(e);
        }

        let mut scheduler = TaskScheduler::new(session.clone());
        let windows = SessionScheduler::new(self.settings.total, self.settings.window)
            .with_top_k(self.settings.top_k)
            .schedule(&mut scheduler, Arc::clone(&buffer), &session, reports);

        let stop = stream.clone();
        scheduler.schedule("stream shutdown", self.settings.total, async move {
            log::info!("⏱️  Total run time reached, stopping stream");
            stop.cancel();
        });

        let completed = scheduler.join_all().await;
        log::debug!("{} scheduled tasks completed", completed);

        stream.cancel();
        let stats = match ingest.await {
            Ok(stats) => stats,
            Err(e) => {
                log::error!("❌ Ingestion task failed: {}", e);
                IngestStats::default()
            }
        };

        let summary = SessionSummary {
            windows_scheduled: windows,
            events_ingested: buffer.pushed(),
            events_unclaimed: buffer.pending(),
            source_errors: stats.source_errors,
            interrupted: session.is_cancelled(),
        };

        if summary.interrupted {
            log::warn!("⚠️  Session interrupted, open windows reported early");
        }

        Ok(summary)
    }

    /// Wait for the first ingested entry
    async fn await_readiness(
        &self,
        buffer: &IngestBuffer,
        ingest: &JoinHandle<IngestStats>,
        session: &CancellationToken,
    ) -> Result<(), SessionError> {
        let started = Instant::now();
        log::info!("⏳ Waiting for the first event...");

        loop {
            // Read completion first: a task seen as finished has already made
            // every push visible, so the check below cannot miss its entry.
            let finished = ingest.is_finished();

            if buffer.has_produced() {
                log::info!(
                    "✅ Ingestion ready after {:.1}s",
                    started.elapsed().as_secs_f64()
                );
                return Ok(());
            }

            let waited = started.elapsed();
            if finished || waited >= self.settings.readiness_timeout {
                return Err(SessionError::IngestionNeverStarted { waited });
            }

            tokio::select! {
                _ = session.cancelled() => return Err(SessionError::Interrupted),
                _ = sleep(self.settings.readiness_poll) => {}
            }
        }
    }
}
