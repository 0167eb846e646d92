//! Shared load -> scrape -> merge -> save workflow.
//!
//! The subcommands only differ in where the page comes from and what they
//! print; the dataset lifecycle is the same for all of them: read once at
//! the start, written once at the end.

use std::path::Path;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::browser::CalendarPage;
use crate::domain::{DayRange, ScrapeConfig};
use crate::error::AppError;
use crate::io::{CsvStore, DatasetStore};
use crate::merge::{MergeStats, merge_with_stats};
use crate::scrape::{RangeOutput, RangeScraper};

/// Scrape `range` into the stored dataset and save the result.
///
/// Completed days are saved even when the run was cancelled part way.
pub async fn run_scrape<P: CalendarPage + ?Sized>(
    page: &mut P,
    store: &dyn DatasetStore,
    config: ScrapeConfig,
    range: DayRange,
    cancel: CancellationToken,
) -> Result<RangeOutput, AppError> {
    let existing = store.load()?;
    info!(records = existing.len(), days = range.len(), "starting scrape");

    let scraper = RangeScraper::new(config, cancel);
    let out = scraper.run(page, existing, range).await;

    store.save(&out.dataset)?;
    Ok(out)
}

/// Outputs of `merge`.
#[derive(Debug, Clone)]
pub struct MergeRun {
    pub incoming_read: usize,
    pub stats: MergeStats,
    pub total: usize,
}

/// Merge the dataset file at `incoming` into `store`.
pub fn run_merge(incoming: &Path, store: &CsvStore) -> Result<MergeRun, AppError> {
    if !incoming.exists() {
        return Err(AppError::new(2, format!("Incoming dataset '{}' does not exist.", incoming.display())));
    }
    let report = CsvStore::new(incoming, store.offset()).load_report()?;
    for err in &report.row_errors {
        warn!(path = %incoming.display(), line = err.line, "skipped incoming row: {}", err.message);
    }
    if report.dataset.is_empty() {
        return Err(AppError::new(3, format!("No records to merge in '{}'.", incoming.display())));
    }
    let incoming_read = report.dataset.len();

    let existing = store.load()?;
    let (merged, stats) = merge_with_stats(existing, report.dataset.into_records());
    store.save(&merged)?;

    Ok(MergeRun {
        incoming_read,
        stats,
        total: merged.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use chrono::{FixedOffset, NaiveDate};

    use crate::browser::fake::{FakeDay, FakePage, FakeRow};
    use crate::data::calendar_url;
    use crate::retry::{RetryPolicy, Throttle};

    fn ny() -> FixedOffset {
        FixedOffset::west_opt(5 * 3600).unwrap()
    }

    fn config(dir: &Path) -> ScrapeConfig {
        ScrapeConfig {
            utc_offset: ny(),
            day_retry: RetryPolicy::new(2, Duration::ZERO, Duration::ZERO),
            throttle: Throttle::none(),
            debug_dir: dir.join("debug"),
            ..ScrapeConfig::default()
        }
    }

    #[tokio::test]
    async fn scraping_twice_keeps_one_row_per_event() {
        let dir = tempfile::tempdir().unwrap();
        let store = CsvStore::new(dir.path().join("calendar.csv"), ny());
        let day = NaiveDate::from_ymd_opt(2025, 11, 24).unwrap();

        let mut first = FakeRow::event("8:30am", "USD", "icon--ff-impact-red", "Non-Farm Payrolls");
        first.forecast = "200K".to_string();
        let mut page = FakePage::new();
        page.add_day(calendar_url(day, day), FakeDay::with_rows(vec![first.clone()]));
        run_scrape(&mut page, &store, config(dir.path()), DayRange::single(day), CancellationToken::new())
            .await
            .unwrap();

        let mut later = first;
        later.actual = "256K".to_string();
        let mut page = FakePage::new();
        page.add_day(calendar_url(day, day), FakeDay::with_rows(vec![later]));
        let out = run_scrape(&mut page, &store, config(dir.path()), DayRange::single(day), CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(out.summary.records_updated, 1);
        let stored = store.load().unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored.records()[0].actual.as_deref(), Some("256K"));
        assert_eq!(stored.records()[0].forecast.as_deref(), Some("200K"));
    }

    #[test]
    fn merge_rejects_empty_input() {
        let dir = tempfile::tempdir().unwrap();
        let incoming = dir.path().join("incoming.csv");
        std::fs::write(&incoming, "DateTime,Currency,Impact,Event,Actual,Forecast,Previous,Detail\n").unwrap();
        let store = CsvStore::new(dir.path().join("calendar.csv"), ny());

        let err = run_merge(&incoming, &store).unwrap_err();
        assert_eq!(err.exit_code(), 3);
    }

    #[test]
    fn merge_adds_incoming_records() {
        let dir = tempfile::tempdir().unwrap();
        let incoming = dir.path().join("incoming.csv");
        std::fs::write(
            &incoming,
            "DateTime,Currency,Impact,Event,Actual,Forecast,Previous,Detail\n\
             2025-11-24T08:30:00-05:00,USD,HIGH,Non-Farm Payrolls,,200K,150K,\n",
        )
        .unwrap();
        let store = CsvStore::new(dir.path().join("calendar.csv"), ny());

        let run = run_merge(&incoming, &store).unwrap();
        assert_eq!(run.stats.added, 1);
        assert_eq!(run.total, 1);
        assert_eq!(store.load().unwrap().len(), 1);
    }
}
