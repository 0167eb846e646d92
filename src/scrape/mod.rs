//! Walking a date range one calendar day at a time.
//!
//! Per day: navigate (or reload on a retry), wait for the table, extract the
//! rows, optionally read details, then merge the day into the dataset. A day
//! that keeps failing is recorded, its page is saved for inspection, and the
//! walk moves on.

use chrono::NaiveDate;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::browser::CalendarPage;
use crate::data::calendar_url;
use crate::debug::write_page_snapshot;
use crate::domain::{Dataset, DayRange, Record, ScrapeConfig};
use crate::error::DayError;
use crate::extract::{DayExtraction, DetailExtractor, extract_day};
use crate::merge::merge_with_stats;

/// Counts reported after a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScrapeSummary {
    pub days_requested: usize,
    pub days_completed: usize,
    /// Days that failed after exhausting their retries, in order.
    pub failed_days: Vec<NaiveDate>,
    pub rows_skipped: usize,
    pub detail_failures: usize,
    pub records_emitted: usize,
    pub records_added: usize,
    pub records_updated: usize,
    /// Stopped early on request; only completed days were merged.
    pub cancelled: bool,
}

#[derive(Debug, Clone)]
pub struct RangeOutput {
    pub dataset: Dataset,
    pub summary: ScrapeSummary,
}

pub struct RangeScraper {
    config: ScrapeConfig,
    cancel: CancellationToken,
    detail: DetailExtractor,
}

impl RangeScraper {
    pub fn new(config: ScrapeConfig, cancel: CancellationToken) -> Self {
        let detail = DetailExtractor::new(config.detail_retry, config.detail_timeout);
        Self { config, cancel, detail }
    }

    pub fn config(&self) -> &ScrapeConfig {
        &self.config
    }

    /// Scrape every day of `range` in order, merging each completed day into
    /// `dataset`. Day failures are counted, never returned.
    pub async fn run<P: CalendarPage + ?Sized>(&self, page: &mut P, mut dataset: Dataset, range: DayRange) -> RangeOutput {
        let mut summary = ScrapeSummary {
            days_requested: range.len(),
            ..ScrapeSummary::default()
        };

        for (i, day) in range.days().enumerate() {
            if self.cancel.is_cancelled() || (i > 0 && !self.pause().await) {
                info!(%day, "cancelled, stopping before this day");
                summary.cancelled = true;
                break;
            }

            match self.scrape_day(page, day, &dataset, &mut summary).await {
                Ok(day_records) => {
                    let emitted = day_records.len();
                    let (merged, stats) = merge_with_stats(dataset, day_records);
                    dataset = merged;
                    summary.days_completed += 1;
                    summary.records_emitted += emitted;
                    summary.records_added += stats.added;
                    summary.records_updated += stats.updated;
                    info!(%day, emitted, added = stats.added, updated = stats.updated, "day complete");
                }
                Err(err) => {
                    warn!(%day, "day failed: {err}");
                    if let DayError::Unparsed { skipped, .. } = &err {
                        summary.rows_skipped += skipped;
                    }
                    summary.failed_days.push(day);
                    self.save_snapshot(page, day).await;
                }
            }
        }

        RangeOutput { dataset, summary }
    }

    async fn scrape_day<P: CalendarPage + ?Sized>(
        &self,
        page: &mut P,
        day: NaiveDate,
        dataset: &Dataset,
        summary: &mut ScrapeSummary,
    ) -> Result<Vec<Record>, DayError> {
        let url = calendar_url(day, day);
        let offset = self.config.utc_offset;
        let render_timeout = self.config.render_timeout;

        let DayExtraction { rows, stats } = self
            .config
            .day_retry
            .run("day extraction", page, |page, attempt| {
                let url = url.clone();
                Box::pin(async move {
                    if attempt == 1 {
                        debug!(%day, url = %url, "navigating");
                        page.navigate(&url).await?;
                    } else {
                        debug!(%day, attempt, "reloading");
                        page.reload().await?;
                    }
                    page.wait_for_table(render_timeout).await?;

                    let extraction = extract_day(&mut *page, day, offset).await?;
                    if extraction.rows.is_empty() {
                        let expected = page.expected_event_count().await?;
                        if expected > 0 || extraction.stats.skipped > 0 {
                            return Err(DayError::Unparsed {
                                expected,
                                skipped: extraction.stats.skipped,
                            });
                        }
                        debug!(%day, "no events scheduled");
                    }
                    Ok(extraction)
                })
            })
            .await?;
        summary.rows_skipped += stats.skipped;

        let mut records = Vec::with_capacity(rows.len());
        for mut row in rows {
            if self.config.details && row.record.has_detail_marker && !dataset.has_detail(&row.record.key()) {
                if !self.detail.enrich(page, &mut row.record, row.index).await {
                    summary.detail_failures += 1;
                }
            }
            records.push(row.record);
        }
        Ok(records)
    }

    /// Throttle between days. `false` if cancelled while waiting.
    async fn pause(&self) -> bool {
        let delay = self.config.throttle.next_delay();
        if delay.is_zero() {
            return !self.cancel.is_cancelled();
        }
        debug!(delay_ms = delay.as_millis() as u64, "throttling");
        tokio::select! {
            _ = self.cancel.cancelled() => false,
            _ = tokio::time::sleep(delay) => true,
        }
    }

    async fn save_snapshot<P: CalendarPage + ?Sized>(&self, page: &mut P, day: NaiveDate) {
        let content = match page.content().await {
            Ok(content) => content,
            Err(err) => {
                warn!(%day, "no page content to save: {err}");
                return;
            }
        };
        match write_page_snapshot(&self.config.debug_dir, day, &content) {
            Ok(path) => info!(%day, path = %path.display(), "saved page snapshot"),
            Err(err) => warn!(%day, "could not save page snapshot: {err}"),
        }
    }
}
