//! Aggregator Core - Per-Window Report Engine
//!
//! Each window owns one [`Aggregator`] that drains the window's private queue,
//! classifies every captured entry and produces a single [`Report`].
//!
//! # Architecture
//!
//! ```text
//! private window queue → Aggregator (PostEvent::decode)
//!     ↓
//! WindowCounters + OccurrenceTable (languages, hashtags, domains, mentions)
//!     ↓
//! Report (first-fit top-K, link/photo/reshare rates)
//!     ↓
//! report_sink_task → Console, TextFile or JSONL sink
//! ```

pub mod aggregator;
pub mod console_writer;
pub mod jsonl_writer;
pub mod occurrence;
pub mod payload;
pub mod report;
pub mod text_file_writer;
pub mod writer;
pub mod writer_backend;

pub use aggregator::{Aggregator, WindowCounters};
pub use console_writer::ConsoleSink;
pub use jsonl_writer::JsonlSink;
pub use occurrence::{select_top_k, OccurrenceTable, RankedEntry, DEFAULT_TOP_K};
pub use payload::{ContentPost, DecodeError, PostEvent};
pub use report::{Rate, Report};
pub use text_file_writer::TextFileSink;
pub use writer::{build_sink, report_sink_task, JSONL_REPORT_FILE};
pub use writer_backend::{ReportSink, SinkError};
