use async_trait::async_trait;

#[derive(Debug)]
pub enum SourceError {
    Connect(String),
    Status(u16),
    Transport(String),
    Io(std::io::Error),
    Closed,
}

impl From<std::io::Error> for SourceError {
    fn from(err: std::io::Error) -> Self {
        SourceError::Io(err)
    }
}

impl std::fmt::Display for SourceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceError::Connect(msg) => write!(f, "Connection error: {}", msg),
            SourceError::Status(code) => write!(f, "Stream endpoint returned HTTP {}", code),
            SourceError::Transport(msg) => write!(f, "Stream transport error: {}", msg),
            SourceError::Io(e) => write!(f, "IO error: {}", e),
            SourceError::Closed => write!(f, "Stream closed by peer"),
        }
    }
}

impl std::error::Error for SourceError {}

/// A producer of raw event payloads
#[async_trait]
pub trait EventSource: Send {
    /// Connect or open the source. A failure here is fatal for the session.
    async fn start(&mut self) -> Result<(), SourceError>;

    /// Next payload; `None` once the source has nothing more to deliver
    async fn next_payload(&mut self) -> Option<Result<String, SourceError>>;

    /// Release the underlying connection or file
    async fn stop(&mut self);

    /// Get source type for logging
    fn source_type(&self) -> &'static str;
}
