//! Shared pipeline types

use std::fmt;
use std::time::Duration;

/// A single payload captured from the event source.
///
/// The payload is opaque to the pipeline; only the aggregator decodes it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEvent {
    payload: String,
}

impl RawEvent {
    pub fn new(payload: impl Into<String>) -> Self {
        Self {
            payload: payload.into(),
        }
    }

    pub fn payload(&self) -> &str {
        &self.payload
    }

    pub fn len(&self) -> usize {
        self.payload.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }
}

impl From<String> for RawEvent {
    fn from(payload: String) -> Self {
        Self::new(payload)
    }
}

impl From<&str> for RawEvent {
    fn from(payload: &str) -> Self {
        Self::new(payload)
    }
}

/// Placement of one report window inside the session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowSpec {
    /// Ordinal report number, starting at 0
    pub index: u32,
    /// Offset from session start at which collection begins
    pub start_delay: Duration,
    /// How long the window collects before it is stopped
    pub duration: Duration,
}

impl WindowSpec {
    pub fn new(index: u32, start_delay: Duration, duration: Duration) -> Self {
        Self {
            index,
            start_delay,
            duration,
        }
    }

    /// Nominal end of the window relative to session start
    pub fn end_offset(&self) -> Duration {
        self.start_delay + self.duration
    }
}

impl fmt::Display for WindowSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "window #{} [+{}s, {}s]",
            self.index,
            self.start_delay.as_secs_f64(),
            self.duration.as_secs_f64()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_end_offset() {
        let spec = WindowSpec::new(2, Duration::from_secs(10), Duration::from_secs(5));
        assert_eq!(spec.end_offset(), Duration::from_secs(15));
        assert_eq!(spec.to_string(), "window #2 [+10s, 5s]");
    }
}
