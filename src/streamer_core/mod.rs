//! Event sources feeding the ingestion buffer

pub mod channel_source;
pub mod error_handler;
pub mod http_source;
pub mod replay_source;
pub mod source;

pub use channel_source::{ChannelSource, EventFeed};
pub use error_handler::{ExponentialBackoff, MaxRetriesExceeded};
pub use http_source::HttpStreamSource;
pub use replay_source::ReplaySource;
pub use source::{EventSource, SourceError};

use crate::config::SourceConfig;

pub fn build_source(config: &SourceConfig) -> Result<Box<dyn EventSource>, SourceError> {
    let source: Box<dyn EventSource> = match config {
        SourceConfig::Http {
            url,
            bearer_token,
            connect_timeout,
        } => Box::new(HttpStreamSource::new(
            url.clone(),
            bearer_token.clone(),
            *connect_timeout,
        )?),
        SourceConfig::Replay { path, pace } => Box::new(ReplaySource::new(path, *pace)),
    };

    log::info!("📡 Event source: {}", source.source_type());
    Ok(source)
}
