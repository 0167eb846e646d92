//! Domain types used throughout the scraper.
//!
//! - calendar records, identity keys, and the ordered dataset (`record`)
//! - explicit run configuration (`config`)

pub mod config;
pub mod record;

pub use config::*;
pub use record::*;
