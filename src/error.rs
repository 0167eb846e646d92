use thiserror::Error;

use crate::browser::BrowserError;

/// Fatal, run-level failure carrying the process exit code.
///
/// Exit codes:
/// - `2`: invalid input, configuration, or persistence I/O
/// - `3`: nothing to do (empty input)
/// - `4`: browser session / network acquisition
#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}

/// Errors that a bounded retry loop may try again.
pub trait Retryable {
    fn is_transient(&self) -> bool;
}

/// A row whose text could be read but not turned into a record.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RowParseError {
    #[error("unknown currency code '{0}'")]
    UnknownCurrency(String),
    #[error("unrecognised time text '{0}'")]
    BadTime(String),
    #[error("row has no time and no earlier row set one")]
    NoTime,
    #[error("row for {0} has no event name")]
    EmptyEvent(String),
}

/// Day-level extraction failure; both kinds trigger a reload-retry.
#[derive(Debug, Error)]
pub enum DayError {
    #[error(transparent)]
    Interaction(#[from] BrowserError),
    #[error("page shows {expected} event(s) but none could be parsed ({skipped} row(s) skipped)")]
    Unparsed { expected: usize, skipped: usize },
}

impl Retryable for DayError {
    fn is_transient(&self) -> bool {
        match self {
            DayError::Interaction(err) => err.is_transient(),
            DayError::Unparsed { .. } => true,
        }
    }
}

#[derive(Debug, Error)]
pub enum DetailError {
    #[error("detail interaction failed: {0}")]
    Interaction(#[from] BrowserError),
}

impl Retryable for DetailError {
    fn is_transient(&self) -> bool {
        match self {
            DetailError::Interaction(err) => err.is_transient(),
        }
    }
}
