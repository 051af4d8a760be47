//! Window terminator - bounds a consumer's lifetime
//!
//! The terminator is registered to fire at the window's start delay. When it
//! fires it starts the consumer and arms a stop timer for the window
//! duration; the stop timer cancels the consumer no matter how far the drain
//! has progressed.

use super::types::WindowSpec;
use super::windows::{WindowConsumer, WindowState};
use tokio::time::{sleep, Duration};
use tokio_util::sync::CancellationToken;

/// Outcome of one terminated window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TerminatedWindow {
    pub spec: WindowSpec,
    pub drained: u64,
    pub state: WindowState,
}

pub struct WindowTerminator {
    consumer: WindowConsumer,
    duration: Duration,
    start_delay: Duration,
    cancel: CancellationToken,
}

impl WindowTerminator {
    /// `cancel` is the window's own token; it should be a child of the
    /// session token so a session shutdown also stops the window.
    pub fn new(
        consumer: WindowConsumer,
        duration: Duration,
        start_delay: Duration,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            consumer,
            duration,
            start_delay,
            cancel,
        }
    }

    pub fn start_delay(&self) -> Duration {
        self.start_delay
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Start the consumer and stop it after the window duration
    pub async fn fire(self) -> TerminatedWindow {
        let WindowTerminator {
            mut consumer,
            duration,
            cancel,
            ..
        } = self;
        let spec = *consumer.spec();

        let stop_timer = async {
            tokio::select! {
                _ = sleep(duration) => {
                    log::debug!("⏱️  {} stop timer elapsed", spec);
                }
                _ = cancel.cancelled() => {
                    log::debug!("{} cancelled before its stop timer", spec);
                }
            }
            cancel.cancel();
        };

        let (drained, ()) = tokio::join!(consumer.run(cancel.clone()), stop_timer);

        TerminatedWindow {
            spec,
            drained,
            state: consumer.state(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::ingestion::IngestBuffer;
    use crate::pipeline::types::RawEvent;
    use std::sync::Arc;
    use tokio::time::Instant;

    #[tokio::test(start_paused = true)]
    async fn test_window_stops_after_duration() {
        let buffer = Arc::new(IngestBuffer::new());
        let spec = WindowSpec::new(0, Duration::ZERO, Duration::from_secs(3));
        let (consumer, mut private_rx) = WindowConsumer::new(spec, buffer.clone());
        let terminator = WindowTerminator::new(consumer, spec.duration, spec.start_delay, CancellationToken::new());

        let feeder = {
            let buffer = buffer.clone();
            tokio::spawn(async move {
                for i in 0..4 {
                    buffer.push(RawEvent::new(format!("e{}", i)));
                    sleep(Duration::from_millis(500)).await;
                }
            })
        };

        let started = Instant::now();
        let outcome = terminator.fire().await;
        feeder.await.unwrap();

        assert!(started.elapsed() >= Duration::from_secs(3));
        assert!(started.elapsed() < Duration::from_secs(4));
        assert_eq!(outcome.state, WindowState::Closed);
        assert_eq!(outcome.drained, 4);

        let mut count = 0;
        while private_rx.recv().await.is_some() {
            count += 1;
        }
        assert_eq!(count, 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_parent_cancel_stops_window_early() {
        let buffer = Arc::new(IngestBuffer::new());
        let spec = WindowSpec::new(1, Duration::ZERO, Duration::from_secs(60));
        let (consumer, _private_rx) = WindowConsumer::new(spec, buffer);

        let session = CancellationToken::new();
        let terminator = WindowTerminator::new(consumer, spec.duration, spec.start_delay, session.child_token());

        let canceller = {
            let session = session.clone();
            tokio::spawn(async move {
                sleep(Duration::from_secs(5)).await;
                session.cancel();
            })
        };

        let started = Instant::now();
        let outcome = terminator.fire().await;
        canceller.await.unwrap();

        assert!(started.elapsed() < Duration::from_secs(60));
        assert_eq!(outcome.state, WindowState::Closed);
    }
}
