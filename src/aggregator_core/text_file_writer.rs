use crate::aggregator_core::report::Report;
use crate::aggregator_core::writer_backend::{ReportSink, SinkError};
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Writes each report to its own `Report <index>.txt` file
pub struct TextFileSink {
    dir: PathBuf,
    written: Vec<PathBuf>,
}

impl TextFileSink {
    pub fn new(dir: impl AsRef<Path>) -> Result<Self, SinkError> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)?;

        Ok(Self {
            dir: dir.to_path_buf(),
            written: Vec::new(),
        })
    }

    pub fn path_for(&self, index: u32) -> PathBuf {
        self.dir.join(format!("Report {}.txt", index))
    }

    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }
}

#[async_trait]
impl ReportSink for TextFileSink {
    async fn deliver(&mut self, report: &Report) -> Result<(), SinkError> {
        let path = self.path_for(report.index);
        tokio::fs::write(&path, report.render_text()).await?;
        log::debug!("📝 Wrote {}", path.display());
        self.written.push(path);
        Ok(())
    }

    async fn flush(&mut self) -> Result<(), SinkError> {
        Ok(())
    }

    fn sink_type(&self) -> &'static str {
        "TextFile"
    }
}
