//! Run configuration passed explicitly into the scraper.

use std::path::PathBuf;
use std::time::Duration;

use chrono::{FixedOffset, NaiveDate, Offset, Utc};

use crate::retry::{RetryPolicy, Throttle};

/// Inclusive range of calendar days.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DayRange {
    /// `None` when `end` precedes `start`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Option<Self> {
        (start <= end).then_some(Self { start, end })
    }

    pub fn single(day: NaiveDate) -> Self {
        Self { start: day, end: day }
    }

    pub fn len(&self) -> usize {
        (self.end - self.start).num_days() as usize + 1
    }

    /// Days in chronological order.
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> {
        let end = self.end;
        self.start.iter_days().take_while(move |d| *d <= end)
    }
}

/// Everything the range scraper needs to know; no process-wide state.
#[derive(Debug, Clone)]
pub struct ScrapeConfig {
    /// Offset of the times displayed by the site.
    pub utc_offset: FixedOffset,
    /// Run the detail pass on rows that offer one.
    pub details: bool,
    /// Bounded wait for the calendar table to render.
    pub render_timeout: Duration,
    /// Attempts per day; every attempt after the first reloads the page.
    pub day_retry: RetryPolicy,
    /// Attempts per detail expansion.
    pub detail_retry: RetryPolicy,
    /// Bounded wait for an expanded detail table.
    pub detail_timeout: Duration,
    pub throttle: Throttle,
    /// Where raw pages of failed days are written.
    pub debug_dir: PathBuf,
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            utc_offset: Utc.fix(),
            details: false,
            render_timeout: Duration::from_secs(10),
            day_retry: RetryPolicy::new(2, Duration::from_millis(500), Duration::from_secs(2)),
            detail_retry: RetryPolicy::new(3, Duration::from_millis(250), Duration::from_secs(2)),
            detail_timeout: Duration::from_secs(3),
            throttle: Throttle {
                base: Duration::from_millis(1500),
                jitter: Duration::from_millis(1000),
            },
            debug_dir: PathBuf::from("debug"),
        }
    }
}

/// Parse `+HH:MM`, `-HH:MM`, `+HHMM`, `Z` or `UTC`.
pub fn parse_utc_offset(s: &str) -> Result<FixedOffset, String> {
    let s = s.trim();
    if s.eq_ignore_ascii_case("z") || s.eq_ignore_ascii_case("utc") {
        return Ok(Utc.fix());
    }
    s.parse::<FixedOffset>()
        .map_err(|e| format!("Invalid UTC offset '{s}' ({e}). Expected +HH:MM or -HH:MM."))
}
