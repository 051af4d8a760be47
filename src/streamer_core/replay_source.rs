use crate::streamer_core::source::{EventSource, SourceError};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader, Lines};

/// Replays a recorded JSONL capture, one payload per line
pub struct ReplaySource {
    path: PathBuf,
    pace: Duration,
    lines: Option<Lines<BufReader<File>>>,
    replayed: u64,
}

impl ReplaySource {
    pub fn new(path: impl AsRef<Path>, pace: Duration) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            pace,
            lines: None,
            replayed: 0,
        }
    }

    pub fn replayed(&self) -> u64 {
        self.replayed
    }
}

#[async_trait]
impl EventSource for ReplaySource {
    async fn start(&mut self) -> Result<(), SourceError> {
        let file = File::open(&self.path).await?;
        self.lines = Some(BufReader::new(file).lines());
        log::info!("📂 Replaying {}", self.path.display());
        Ok(())
    }

    async fn next_payload(&mut self) -> Option<Result<String, SourceError>> {
        let lines = self.lines.as_mut()?;

        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    let line = line.trim();
                    if line.is_empty() {
                        continue;
                    }
                    if self.replayed > 0 && !self.pace.is_zero() {
                        tokio::time::sleep(self.pace).await;
                    }
                    self.replayed += 1;
                    return Some(Ok(line.to_string()));
                }
                Ok(None) => {
                    log::info!("📂 Replay finished after {} payloads", self.replayed);
                    self.lines = None;
                    return None;
                }
                Err(e) => return Some(Err(SourceError::Io(e))),
            }
        }
    }

    async fn stop(&mut self) {
        self.lines = None;
    }

    fn source_type(&self) -> &'static str {
        "Replay"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[tokio::test]
    async fn test_replays_non_blank_lines_then_ends() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "{{\"lang\":\"en\"}}").unwrap();
        writeln!(file).unwrap();
        writeln!(file, "{{\"delete\":{{}}}}").unwrap();
        file.flush().unwrap();

        let mut source = ReplaySource::new(file.path(), Duration::ZERO);
        source.start().await.unwrap();

        let first = source.next_payload().await.unwrap().unwrap();
        let second = source.next_payload().await.unwrap().unwrap();
        assert_eq!(first, "{\"lang\":\"en\"}");
        assert_eq!(second, "{\"delete\":{}}");
        assert!(source.next_payload().await.is_none());
        assert_eq!(source.replayed(), 2);
    }

    #[tokio::test]
    async fn test_missing_file_fails_to_start() {
        let dir = tempfile::tempdir().unwrap();
        let mut source = ReplaySource::new(dir.path().join("missing.jsonl"), Duration::ZERO);

        assert!(matches!(source.start().await, Err(SourceError::Io(_))));
    }
}
