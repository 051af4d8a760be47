use crate::streamer_core::error_handler::ExponentialBackoff;
use crate::streamer_core::source::{EventSource, SourceError};
use async_trait::async_trait;
use reqwest::{Client, Response, Url};
use std::collections::VecDeque;
use std::time::Duration;

/// Newline-delimited JSON stream read over a long-lived HTTP response
pub struct HttpStreamSource {
    client: Client,
    url: Url,
    bearer_token: Option<String>,
    response: Option<Response>,
    partial: Vec<u8>,
    ready: VecDeque<String>,
    backoff: ExponentialBackoff,
    exhausted: bool,
}

impl HttpStreamSource {
    pub fn new(
        url: Url,
        bearer_token: Option<String>,
        connect_timeout: Duration,
    ) -> Result<Self, SourceError> {
        let client = Client::builder()
            .connect_timeout(connect_timeout)
            .build()
            .map_err(|e| SourceError::Connect(e.to_string()))?;

        Ok(Self {
            client,
            url,
            bearer_token,
            response: None,
            partial: Vec::new(),
            ready: VecDeque::new(),
            backoff: ExponentialBackoff::new(Duration::from_secs(5), Duration::from_secs(60), 10),
            exhausted: false,
        })
    }

    /// Replace the default reconnect policy (5s initial, 60s max, 10 retries)
    pub fn with_backoff(mut self, backoff: ExponentialBackoff) -> Self {
        self.backoff = backoff;
        self
    }

    async fn connect(&mut self) -> Result<(), SourceError> {
        let mut request = self.client.get(self.url.clone());
        if let Some(token) = &self.bearer_token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| SourceError::Connect(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Status(status.as_u16()));
        }

        log::info!("✅ Connected to stream at {}", self.url);
        self.partial.clear();
        self.response = Some(response);
        Ok(())
    }
}

/// Move every complete line out of `partial`, skipping keep-alive blanks
pub fn drain_lines(partial: &mut Vec<u8>, ready: &mut VecDeque<String>) {
    while let Some(pos) = partial.iter().position(|b| *b == b'\n') {
        let line: Vec<u8> = partial.drain(..=pos).collect();
        let text = String::from_utf8_lossy(&line);
        let text = text.trim();
        if !text.is_empty() {
            ready.push_back(text.to_string());
        }
    }
}

#[async_trait]
impl EventSource for HttpStreamSource {
    async fn start(&mut self) -> Result<(), SourceError> {
        self.connect().await
    }

    async fn next_payload(&mut self) -> Option<Result<String, SourceError>> {
        loop {
            if let Some(line) = self.ready.pop_front() {
                return Some(Ok(line));
            }

            if self.exhausted {
                return None;
            }

            let Some(response) = self.response.as_mut() else {
                if let Err(e) = self.backoff.sleep().await {
                    log::error!("❌ Giving up on stream: {}", e);
                    self.exhausted = true;
                    return None;
                }
                match self.connect().await {
                    Ok(()) => {
                        self.backoff.reset();
                        continue;
                    }
                    Err(e) => return Some(Err(e)),
                }
            };

            match response.chunk().await {
                Ok(Some(bytes)) => {
                    self.partial.extend_from_slice(&bytes);
                    drain_lines(&mut self.partial, &mut self.ready);
                }
                Ok(None) => {
                    self.response = None;
                    return Some(Err(SourceError::Closed));
                }
                Err(e) => {
                    self.response = None;
                    return Some(Err(SourceError::Transport(e.to_string())));
                }
            }
        }
    }

    async fn stop(&mut self) {
        self.response = None;
        self.exhausted = true;
    }

    fn source_type(&self) -> &'static str {
        "HTTP"
    }
}
