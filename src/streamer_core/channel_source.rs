use crate::streamer_core::source::{EventSource, SourceError};
use async_trait::async_trait;
use tokio::sync::mpsc;

/// In-process source fed through an [`EventFeed`] callback handle
pub struct ChannelSource {
    rx: mpsc::UnboundedReceiver<String>,
}

/// Push side of a [`ChannelSource`]
#[derive(Clone)]
pub struct EventFeed {
    tx: mpsc::UnboundedSender<String>,
}

impl ChannelSource {
    pub fn new() -> (Self, EventFeed) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { rx }, EventFeed { tx })
    }
}

impl EventFeed {
    /// Hand one payload to the source. Returns false once the source stopped.
    pub fn on_event(&self, payload: impl Into<String>) -> bool {
        self.tx.send(payload.into()).is_ok()
    }
}

#[async_trait]
impl EventSource for ChannelSource {
    async fn start(&mut self) -> Result<(), SourceError> {
        Ok(())
    }

    async fn next_payload(&mut self) -> Option<Result<String, SourceError>> {
        self.rx.recv().await.map(Ok)
    }

    async fn stop(&mut self) {
        self.rx.close();
    }

    fn source_type(&self) -> &'static str {
        "Channel"
    }
}
