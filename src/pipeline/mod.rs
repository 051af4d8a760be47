//! # Windowed Report Pipeline
//!
//! One always-on event source feeds a shared [`IngestBuffer`]. The session is
//! split into fixed, back-to-back windows; each window drains the buffer into
//! its own private queue for its lifetime and hands that queue to its own
//! aggregator, which produces exactly one report.
//!
//! ```text
//! EventSource → run_ingestion → IngestBuffer
//!                                   ↓ (competing takers)
//!                 WindowConsumer #0, #1, ... (Idle → Draining → Closed)
//!                                   ↓ private queue
//!                 Aggregator #0, #1, ... → Report → sink
//! ```
//!
//! Every timer of the session (window start, window stop, stream shutdown)
//! is registered on one shared [`TaskScheduler`].
//!
//! Entries are owned by exactly one window: whichever consumer's poll is
//! served first takes the entry. Across windows there is no ordering.

pub mod ingestion;
pub mod scheduler;
pub mod session;
pub mod supervisor;
pub mod terminator;
pub mod types;
pub mod windows;

pub use ingestion::{run_ingestion, IngestBuffer, IngestStats};
pub use scheduler::TaskScheduler;
pub use session::SessionScheduler;
pub use supervisor::{IngestionSupervisor, SessionError, SessionSummary, SupervisorSettings};
pub use terminator::{TerminatedWindow, WindowTerminator};
pub use types::{RawEvent, WindowSpec};
pub use windows::{WindowConsumer, WindowState};
