//! CTV Decode Result Reporting
//!
//! This crate provides result sinks and key/value token stores for decoded
//! capture records, plus a markdown summary report across captures.

pub mod ituff;
pub mod memory;
pub mod reporter;

pub use ituff::ItuffWriter;
pub use memory::{JsonLinesSink, MemorySink, MemoryTokenStore};
pub use reporter::{CaptureSummary, ReportGenerator};
