use crate::aggregator_core::report::Report;
use crate::aggregator_core::writer_backend::{ReportSink, SinkError};
use async_trait::async_trait;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

pub struct JsonlSink {
    file: BufWriter<File>,
    path: PathBuf,
    lines_written: u64,
}

impl JsonlSink {
    pub fn new(path: impl AsRef<Path>) -> Result<Self, SinkError> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new().create(true).append(true).open(path)?;

        Ok(Self {
            file: BufWriter::new(file),
            path: path.to_path_buf(),
            lines_written: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn lines_written(&self) -> u64 {
        self.lines_written
    }

    pub fn write_report(&mut self, report: &Report) -> Result<(), SinkError> {
        let json = serde_json::to_string(report)?;
        writeln!(self.file, "{}", json)?;
        self.file.flush()?;
        self.lines_written += 1;
        Ok(())
    }
}

#[async_trait]
impl ReportSink for JsonlSink {
    async fn deliver(&mut self, report: &Report) -> Result<(), SinkError> {
        self.write_report(report)
    }

    async fn flush(&mut self) -> Result<(), SinkError> {
        self.file.flush()?;
        Ok(())
    }

    fn sink_type(&self) -> &'static str {
        "JSONL"
    }
}
