//! Stream ingestion - shared buffer fed by the event source
//!
//! One producer (the ingest task) appends raw payloads; every report window
//! takes from the same buffer. Whichever window's poll is serviced first owns
//! the entry.

use super::types::RawEvent;
use crate::streamer_core::EventSource;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio::time::Duration;
use tokio_util::sync::CancellationToken;

/// Unbounded FIFO shared by one producer and many window consumers
pub struct IngestBuffer {
    tx: mpsc::UnboundedSender<RawEvent>,
    rx: Mutex<mpsc::UnboundedReceiver<RawEvent>>,
    pushed: AtomicU64,
    taken: AtomicU64,
}

impl IngestBuffer {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            tx,
            rx: Mutex::new(rx),
            pushed: AtomicU64::new(0),
            taken: AtomicU64::new(0),
        }
    }

    /// Append an event. Never blocks.
    pub fn push(&self, event: RawEvent) {
        // The receiver lives as long as `self`, so the send cannot fail.
        if self.tx.send(event).is_err() {
            log::error!("Ingest buffer receiver dropped, event discarded");
            return;
        }
        self.pushed.fetch_add(1, Ordering::Relaxed);
    }

    /// Take one event, waiting at most `wait`. Returns `None` on timeout.
    pub async fn poll_with_timeout(&self, wait: Duration) -> Option<RawEvent> {
        let polled = tokio::time::timeout(wait, async {
            let mut rx = self.rx.lock().await;
            rx.recv().await
        })
        .await;

        match polled {
            Ok(Some(event)) => {
                self.taken.fetch_add(1, Ordering::Relaxed);
                Some(event)
            }
            Ok(None) | Err(_) => None,
        }
    }

    /// True once the first event has been appended (readiness gate)
    pub fn has_produced(&self) -> bool {
        self.pushed() > 0
    }

    /// Total events appended since creation
    pub fn pushed(&self) -> u64 {
        self.pushed.load(Ordering::Relaxed)
    }

    /// Total events taken by consumers
    pub fn taken(&self) -> u64 {
        self.taken.load(Ordering::Relaxed)
    }

    /// Events appended but not yet claimed by any window
    pub fn pending(&self) -> u64 {
        self.pushed().saturating_sub(self.taken())
    }
}

impl Default for IngestBuffer {
    fn default() -> Self {
        Self::new()
    }
}

/// Counters reported by the ingest task when it stops
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestStats {
    pub delivered: u64,
    pub source_errors: u64,
}

/// Drive an event source into the shared buffer until cancelled
///
/// Per-message delivery failures are logged and skipped; the connection is
/// kept. The loop also ends when the source reports end-of-stream. The source
/// is always stopped before returning.
pub async fn run_ingestion(
    mut source: Box<dyn EventSource>,
    buffer: Arc<IngestBuffer>,
    cancel: CancellationToken,
) -> IngestStats {
    log::info!("📡 Ingestion started ({} source)", source.source_type());

    let mut stats = IngestStats::default();

    loop {
        tokio::select! {
            biased;

            _ = cancel.cancelled() => {
                log::info!("🛑 Ingestion cancelled, closing stream");
                break;
            }

            next = source.next_payload() => {
                match next {
                    Some(Ok(payload)) => {
                        buffer.push(RawEvent::new(payload));
                        stats.delivered += 1;
                        if stats.delivered == 1 {
                            log::info!("📥 First event received");
                        }
                    }
                    Some(Err(e)) => {
                        stats.source_errors += 1;
                        log::warn!("⚠️  Event delivery failed: {}", e);
                    }
                    None => {
                        log::warn!("⚠️  Event source ended the stream");
                        break;
                    }
                }
            }
        }
    }

    source.stop().await;

    log::info!(
        "✅ Ingestion stopped: {} events delivered, {} source errors",
        stats.delivered,
        stats.source_errors
    );
    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::streamer_core::{ChannelSource, SourceError};
    use async_trait::async_trait;
    use std::collections::VecDeque;

    /// Replays a fixed script of deliveries, then ends the stream
    struct ScriptedSource {
        script: VecDeque<Result<String, SourceError>>,
    }

    impl ScriptedSource {
        fn new(script: Vec<Result<String, SourceError>>) -> Self {
            Self {
                script: script.into(),
            }
        }
    }

    #[async_trait]
    impl EventSource for ScriptedSource {
        async fn start(&mut self) -> Result<(), SourceError> {
            Ok(())
        }

        async fn next_payload(&mut self) -> Option<Result<String, SourceError>> {
            self.script.pop_front()
        }

        async fn stop(&mut self) {
            self.script.clear();
        }

        fn source_type(&self) -> &'static str {
            "Scripted"
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_times_out_on_empty_buffer() {
        let buffer = IngestBuffer::new();
        let start = tokio::time::Instant::now();

        let polled = buffer.poll_with_timeout(Duration::from_secs(2)).await;

        assert!(polled.is_none());
        assert!(start.elapsed() >= Duration::from_secs(2));
        assert!(!buffer.has_produced());
    }

    #[tokio::test]
    async fn test_push_then_poll_preserves_order() {
        let buffer = IngestBuffer::new();
        buffer.push(RawEvent::new("first"));
        buffer.push(RawEvent::new("second"));

        let a = buffer.poll_with_timeout(Duration::from_millis(50)).await.unwrap();
        let b = buffer.poll_with_timeout(Duration::from_millis(50)).await.unwrap();

        assert_eq!(a.payload(), "first");
        assert_eq!(b.payload(), "second");
        assert_eq!(buffer.pushed(), 2);
        assert_eq!(buffer.taken(), 2);
        assert_eq!(buffer.pending(), 0);
    }

    #[tokio::test]
    async fn test_each_entry_has_a_single_taker() {
        let buffer = Arc::new(IngestBuffer::new());
        buffer.push(RawEvent::new("only"));

        let a = {
            let buffer = buffer.clone();
            tokio::spawn(async move { buffer.poll_with_timeout(Duration::from_millis(100)).await })
        };
        let b = {
            let buffer = buffer.clone();
            tokio::spawn(async move { buffer.poll_with_timeout(Duration::from_millis(100)).await })
        };

        let winners = [a.await.unwrap(), b.await.unwrap()]
            .into_iter()
            .filter(Option::is_some)
            .count();
        assert_eq!(winners, 1);
    }

    #[tokio::test]
    async fn test_ingestion_pushes_until_stream_ends() {
        let (source, feed) = ChannelSource::new();
        let buffer = Arc::new(IngestBuffer::new());

        for i in 0..5 {
            assert!(feed.on_event(format!("{{\"n\":{}}}", i)));
        }
        drop(feed);

        let stats = run_ingestion(Box::new(source), buffer.clone(), CancellationToken::new()).await;

        assert_eq!(stats.delivered, 5);
        assert_eq!(buffer.pushed(), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_ingestion_stops_on_cancel() {
        let (source, feed) = ChannelSource::new();
        let buffer = Arc::new(IngestBuffer::new());
        let cancel = CancellationToken::new();

        let handle = tokio::spawn(run_ingestion(Box::new(source), buffer.clone(), cancel.clone()));
        feed.on_event("{}");
        tokio::time::sleep(Duration::from_millis(10)).await;
        cancel.cancel();

        let stats = handle.await.unwrap();
        assert_eq!(stats.delivered, 1);
        // Source stopped: further pushes are refused
        assert!(!feed.on_event("{}"));
    }

    #[tokio::test]
    async fn test_delivery_error_does_not_stop_ingestion() {
        let source = ScriptedSource::new(vec![
            Ok("{\"n\":1}".to_string()),
            Err(SourceError::Transport("connection reset".to_string())),
            Ok("{\"n\":2}".to_string()),
        ]);
        let buffer = Arc::new(IngestBuffer::new());

        let stats = run_ingestion(Box::new(source), buffer.clone(), CancellationToken::new()).await;

        assert_eq!(stats.delivered, 2);
        assert_eq!(stats.source_errors, 1);
        assert_eq!(buffer.pushed(), 2);
        let first = buffer.poll_with_timeout(Duration::from_millis(10)).await.unwrap();
        assert_eq!(first.payload(), "{\"n\":1}");
    }
}
