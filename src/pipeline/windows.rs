//! Report windows - per-window consumer draining the shared buffer
//!
//! A consumer moves `Idle → Draining → Closed`. While draining it repeatedly
//! polls the shared [`IngestBuffer`] (bounded by the window duration) and
//! forwards every entry to its private queue. Closing drops the private
//! sender, which is how the aggregator on the other end learns that no
//! further entries will arrive. Entries already queued stay queued.

use super::ingestion::IngestBuffer;
use super::types::{RawEvent, WindowSpec};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowState {
    Idle,
    Draining,
    Closed,
}

impl WindowState {
    pub fn as_str(&self) -> &'static str {
        match self {
            WindowState::Idle => "idle",
            WindowState::Draining => "draining",
            WindowState::Closed => "closed",
        }
    }
}

pub struct WindowConsumer {
    spec: WindowSpec,
    buffer: Arc<IngestBuffer>,
    private_tx: Option<mpsc::UnboundedSender<RawEvent>>,
    state: WindowState,
    drained: u64,
}

impl WindowConsumer {
    /// Create a consumer and the receiving end of its private queue
    pub fn new(spec: WindowSpec, buffer: Arc<IngestBuffer>) -> (Self, mpsc::UnboundedReceiver<RawEvent>) {
        let (private_tx, private_rx) = mpsc::unbounded_channel();
        let consumer = Self {
            spec,
            buffer,
            private_tx: Some(private_tx),
            state: WindowState::Idle,
            drained: 0,
        };
        (consumer, private_rx)
    }

    pub fn spec(&self) -> &WindowSpec {
        &self.spec
    }

    pub fn state(&self) -> WindowState {
        self.state
    }

    /// Entries forwarded to the private queue so far
    pub fn drained(&self) -> u64 {
        self.drained
    }

    /// Drain the shared buffer until `cancel` fires
    ///
    /// Cancellation is observed between polls and also interrupts a poll that
    /// is waiting; an entry is never taken from the buffer without being
    /// forwarded. Calling `run` on a consumer that already ran is a no-op.
    pub async fn run(&mut self, cancel: CancellationToken) -> u64 {
        if self.state != WindowState::Idle {
            log::warn!(
                "⚠️  {} already {}, ignoring run request",
                self.spec,
                self.state.as_str()
            );
            return self.drained;
        }
        let Some(private_tx) = self.private_tx.take() else {
            self.state = WindowState::Closed;
            return self.drained;
        };

        self.state = WindowState::Draining;
        log::info!("▶️  {} draining", self.spec);

        let buffer = Arc::clone(&self.buffer);
        let poll_timeout = self.spec.duration;
        let mut drained = 0u64;

        loop {
            tokio::select! {
                biased;

                _ = cancel.cancelled() => break,

                polled = buffer.poll_with_timeout(poll_timeout) => {
                    let Some(event) = polled else { continue };
                    if private_tx.send(event).is_err() {
                        // Nobody left to aggregate; stop taking from the shared buffer.
                        log::warn!("⚠️  {} aggregator gone, closing early", self.spec);
                        break;
                    }
                    drained += 1;
                }
            }
        }

        drop(private_tx);
        self.drained = drained;
        self.state = WindowState::Closed;
        log::info!("⏹️  {} closed after {} entries", self.spec, drained);
        drained
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::Duration;

    fn spec(duration_secs: u64) -> WindowSpec {
        WindowSpec::new(0, Duration::ZERO, Duration::from_secs(duration_secs))
    }

    #[tokio::test(start_paused = true)]
    async fn test_state_transitions_and_private_queue() {
        let buffer = Arc::new(IngestBuffer::new());
        for i in 0..3 {
            buffer.push(RawEvent::new(format!("e{}", i)));
        }

        let (mut consumer, mut private_rx) = WindowConsumer::new(spec(2), buffer.clone());
        assert_eq!(consumer.state(), WindowState::Idle);

        let cancel = CancellationToken::new();
        let stopper = {
            let cancel = cancel.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_secs(1)).await;
                cancel.cancel();
            })
        };

        let drained = consumer.run(cancel).await;
        stopper.await.unwrap();

        assert_eq!(drained, 3);
        assert_eq!(consumer.state(), WindowState::Closed);

        // Entries stay queued after close, then the queue reports closed.
        let mut received = Vec::new();
        while let Some(event) = private_rx.recv().await {
            received.push(event.payload().to_string());
        }
        assert_eq!(received, vec!["e0", "e1", "e2"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_before_run_takes_nothing() {
        let buffer = Arc::new(IngestBuffer::new());
        buffer.push(RawEvent::new("left behind"));

        let (mut consumer, mut private_rx) = WindowConsumer::new(spec(5), buffer.clone());
        let cancel = CancellationToken::new();
        cancel.cancel();

        assert_eq!(consumer.run(cancel).await, 0);
        assert!(private_rx.recv().await.is_none());
        assert_eq!(buffer.pending(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_run_is_ignored() {
        let buffer = Arc::new(IngestBuffer::new());
        let (mut consumer, _private_rx) = WindowConsumer::new(spec(1), buffer);
        let cancel = CancellationToken::new();
        cancel.cancel();

        consumer.run(cancel.clone()).await;
        consumer.run(cancel).await;
        assert_eq!(consumer.state(), WindowState::Closed);
    }
}
