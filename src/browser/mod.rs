//! Browser automation boundary.
//!
//! The scraper only talks to a rendered calendar page through these traits:
//! - `CalendarPage`: navigation, waits, script evaluation, detail interaction
//! - `RowHandle`: structural queries against one calendar row
//!
//! Failures are split into transient ones (stale element, timeout, protocol
//! hiccup) that callers retry, and everything else.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::error::Retryable;

pub mod static_page;

#[cfg(test)]
pub(crate) mod fake;

pub use static_page::StaticPage;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BrowserError {
    #[error("stale element reference: {0}")]
    Stale(String),
    #[error("timed out waiting for {0}")]
    Timeout(String),
    #[error("protocol error: {0}")]
    Protocol(String),
    #[error("element not found: {0}")]
    NotFound(String),
    #[error("browser session unavailable: {0}")]
    Session(String),
}

impl BrowserError {
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            BrowserError::Stale(_) | BrowserError::Timeout(_) | BrowserError::Protocol(_)
        )
    }
}

impl Retryable for BrowserError {
    fn is_transient(&self) -> bool {
        BrowserError::is_transient(self)
    }
}

/// One calendar row, queried structurally.
///
/// Handles go stale when the page navigates or reloads.
#[async_trait]
pub trait RowHandle: Send + Sync {
    async fn class_name(&self) -> Result<String, BrowserError>;

    /// Text of the first element matching `selector`; `NotFound` if absent.
    async fn text(&self, selector: &str) -> Result<String, BrowserError>;

    /// Attribute of the first element matching `selector`; `NotFound` if the
    /// element is absent, `Ok(None)` if only the attribute is.
    async fn attribute(&self, selector: &str, name: &str) -> Result<Option<String>, BrowserError>;

    async fn exists(&self, selector: &str) -> Result<bool, BrowserError>;
}

/// A single browser tab showing the calendar.
///
/// The page is an exclusively owned resource: one day is navigated, rendered
/// and extracted at a time.
#[async_trait]
pub trait CalendarPage: Send {
    async fn navigate(&mut self, url: &str) -> Result<(), BrowserError>;

    async fn reload(&mut self) -> Result<(), BrowserError>;

    /// Wait (bounded) until the calendar table has rendered.
    async fn wait_for_table(&mut self, timeout: Duration) -> Result<(), BrowserError>;

    /// Calendar rows in document order.
    async fn rows(&mut self) -> Result<Vec<Box<dyn RowHandle>>, BrowserError>;

    /// Flat field snapshot of every row, taken by in-page evaluation.
    ///
    /// Each element is an object with `className`, `time`, `currency`,
    /// `impact`, `event`, `actual`, `forecast`, `previous`, and `hasDetail`.
    async fn evaluate_rows(&mut self) -> Result<Vec<Value>, BrowserError>;

    /// Same snapshot as `evaluate_rows` for the row at `index` only.
    async fn evaluate_row(&mut self, index: usize) -> Result<Value, BrowserError>;

    /// Number of events the page says it lists, independent of row parsing.
    async fn expected_event_count(&mut self) -> Result<usize, BrowserError>;

    /// Click the detail toggle of the row at `index`.
    async fn expand_detail(&mut self, index: usize) -> Result<(), BrowserError>;

    /// Wait (bounded) for the expanded specification table and read its
    /// key/value pairs in table order.
    async fn detail_table(&mut self, timeout: Duration) -> Result<Vec<(String, String)>, BrowserError>;

    async fn close_detail(&mut self) -> Result<(), BrowserError>;

    /// Raw page markup, for debug artifacts.
    async fn content(&mut self) -> Result<String, BrowserError>;
}
