//! Session scheduler - splits the session into fixed report windows
//!
//! `window_count = total / window` (integer division); a trailing partial
//! window is not scheduled. Window `i` starts `i * window` after the session
//! origin. Each window gets a consumer, a terminator and an aggregator; the
//! terminator and the aggregator are registered at the same delay.

use super::ingestion::IngestBuffer;
use super::scheduler::TaskScheduler;
use super::terminator::WindowTerminator;
use super::types::WindowSpec;
use super::windows::WindowConsumer;
use crate::aggregator_core::{Aggregator, Report, DEFAULT_TOP_K};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::Duration;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy)]
pub struct SessionScheduler {
    total: Duration,
    window: Duration,
    top_k: usize,
}

impl SessionScheduler {
    pub fn new(total: Duration, window: Duration) -> Self {
        Self {
            total,
            window,
            top_k: DEFAULT_TOP_K,
        }
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    /// Number of complete windows that fit in the session
    pub fn window_count(&self) -> u32 {
        let window = self.window.as_millis();
        if window == 0 {
            return 0;
        }
        u32::try_from(self.total.as_millis() / window).unwrap_or(u32::MAX)
    }

    pub fn plan(&self) -> Vec<WindowSpec> {
        (0..self.window_count())
            .map(|i| WindowSpec::new(i, self.window * i, self.window))
            .collect()
    }

    /// Register every window of the plan with the shared scheduler
    ///
    /// Window tokens are children of `session`. Finished reports are sent on
    /// `reports`. Returns the number of windows scheduled.
    pub fn schedule(
        &self,
        scheduler: &mut TaskScheduler,
        buffer: Arc<IngestBuffer>,
        session: &CancellationToken,
        reports: mpsc::Sender<Report>,
    ) -> usize {
        let plan = self.plan();
        if plan.is_empty() {
            log::warn!(
                "⚠️  Window of {}s does not fit in a {}s session, no reports will be produced",
                self.window.as_secs_f64(),
                self.total.as_secs_f64()
            );
            return 0;
        }

        log::info!(
            "🗓️  Scheduling {} windows of {}s",
            plan.len(),
            self.window.as_secs_f64()
        );

        for spec in &plan {
            let (consumer, private_rx) = WindowConsumer::new(*spec, Arc::clone(&buffer));
            let terminator =
                WindowTerminator::new(consumer, spec.duration, spec.start_delay, session.child_token());
            let aggregator = Aggregator::new(*spec).with_top_k(self.top_k);

            scheduler.schedule(
                format!("terminator #{}", spec.index),
                terminator.start_delay(),
                async move {
                    let outcome = terminator.fire().await;
                    log::debug!(
                        "{} finished {} with {} entries",
                        outcome.spec,
                        outcome.state.as_str(),
                        outcome.drained
                    );
                },
            );

            let reports = reports.clone();
            let index = spec.index;
            scheduler.schedule(format!("aggregator #{}", index), spec.start_delay, async move {
                let report = aggregator.run(private_rx).await;
                if reports.send(report).await.is_err() {
                    log::warn!("⚠️  Report sink closed, report #{} dropped", index);
                }
            });
        }

        plan.len()
    }
}
