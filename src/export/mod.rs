//! Durable, append-only export of harvested records
//!
//! Records are written page by page and flushed immediately, so a killed
//! process loses at most the page that was in flight.

mod format;
mod sink;

pub use format::ExportFormat;
pub use sink::{ExportSink, INCOMPLETE_MARKER_SUFFIX};
