//! Report delivery: sink selection and the delivery task

use crate::aggregator_core::console_writer::ConsoleSink;
use crate::aggregator_core::jsonl_writer::JsonlSink;
use crate::aggregator_core::report::Report;
use crate::aggregator_core::text_file_writer::TextFileSink;
use crate::aggregator_core::writer_backend::{ReportSink, SinkError};
use crate::config::SinkMode;
use std::path::Path;
use tokio::sync::mpsc;

pub const JSONL_REPORT_FILE: &str = "reports.jsonl";

pub fn build_sink(mode: SinkMode, output_dir: &Path) -> Result<Box<dyn ReportSink>, SinkError> {
    let sink: Box<dyn ReportSink> = match mode {
        SinkMode::Console => Box::new(ConsoleSink::stdout()),
        SinkMode::TextFile => Box::new(TextFileSink::new(output_dir)?),
        SinkMode::Jsonl => Box::new(JsonlSink::new(output_dir.join(JSONL_REPORT_FILE))?),
    };

    log::info!("📤 Report sink: {}", sink.sink_type());
    Ok(sink)
}

/// Deliver reports until every sender is dropped.
///
/// A failed delivery is logged and the task moves on to the next report.
/// Returns the number of reports delivered successfully.
pub async fn report_sink_task(
    mut rx: mpsc::Receiver<Report>,
    mut sink: Box<dyn ReportSink>,
) -> usize {
    let mut delivered = 0;

    while let Some(report) = rx.recv().await {
        match sink.deliver(&report).await {
            Ok(()) => delivered += 1,
            Err(e) => log::error!("❌ Failed to deliver report {}: {}", report.index, e),
        }
    }

    if let Err(e) = sink.flush().await {
        log::error!("❌ Failed to flush {} sink: {}", sink.sink_type(), e);
    }

    log::info!("📤 {} sink closed after {} reports", sink.sink_type(), delivered);
    delivered
}
