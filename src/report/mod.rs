//! Reporting: run summaries and event tables.

pub mod format;

pub use format::*;
