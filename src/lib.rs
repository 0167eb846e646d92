//! `ff-calendar` library crate.
//!
//! The binary (`ffcal`) is a thin wrapper around this library so that:
//!
//! - extraction and merge logic is testable without a live site
//! - the page session sits behind a trait and can be swapped
//! - code stays easy to navigate as the project grows

pub mod app;
pub mod browser;
pub mod cli;
pub mod data;
pub mod debug;
pub mod domain;
pub mod error;
pub mod extract;
pub mod io;
pub mod logging;
pub mod merge;
pub mod report;
pub mod retry;
pub mod scrape;
pub mod text;
