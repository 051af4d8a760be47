use crate::aggregator_core::report::Report;
use crate::aggregator_core::writer_backend::{ReportSink, SinkError};
use async_trait::async_trait;
use std::io::Write;

/// Prints rendered reports to a terminal-like stream
pub struct ConsoleSink<W: Write + Send> {
    out: W,
}

impl ConsoleSink<std::io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write + Send> ConsoleSink<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

#[async_trait]
impl<W: Write + Send> ReportSink for ConsoleSink<W> {
    async fn deliver(&mut self, report: &Report) -> Result<(), SinkError> {
        writeln!(self.out, "{}", report.render_text())?;
        self.out.flush()?;
        Ok(())
    }

    async fn flush(&mut self) -> Result<(), SinkError> {
        self.out.flush()?;
        Ok(())
    }

    fn sink_type(&self) -> &'static str {
        "Console"
    }
}
