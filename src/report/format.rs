//! Terminal output for runs.
//!
//! All formatting lives here so output changes stay in one place.

use std::path::Path;

use crate::domain::{DayRange, Record};
use crate::merge::MergeStats;
use crate::scrape::ScrapeSummary;

/// Run summary printed after `scrape` and `parse`.
pub fn format_scrape_summary(range: &DayRange, summary: &ScrapeSummary, store: &Path, total: usize) -> String {
    let mut out = String::new();

    out.push_str("=== ffcal - ForexFactory calendar ===\n");
    out.push_str(&format!("Range: {} .. {}\n", range.start, range.end));
    out.push_str(&format!(
        "Days: requested={} completed={} failed={}\n",
        summary.days_requested,
        summary.days_completed,
        summary.failed_days.len()
    ));
    out.push_str(&format!(
        "Records: emitted={} added={} updated={} | rows skipped={} | detail failures={}\n",
        summary.records_emitted,
        summary.records_added,
        summary.records_updated,
        summary.rows_skipped,
        summary.detail_failures
    ));
    if !summary.failed_days.is_empty() {
        let days: Vec<String> = summary.failed_days.iter().map(|d| d.to_string()).collect();
        out.push_str(&format!("Failed days: {}\n", days.join(", ")));
    }
    if summary.cancelled {
        out.push_str("Cancelled: remaining days were not scraped.\n");
    }
    out.push_str(&format!("Dataset: {} ({total} records)\n", store.display()));

    out
}

/// Summary printed after `merge`.
pub fn format_merge_summary(incoming: &Path, read: usize, stats: &MergeStats, store: &Path, total: usize) -> String {
    let mut out = String::new();
    out.push_str("=== ffcal - merge ===\n");
    out.push_str(&format!("Incoming: {} ({read} records)\n", incoming.display()));
    out.push_str(&format!("Added: {} | Updated: {}\n", stats.added, stats.updated));
    out.push_str(&format!("Dataset: {} ({total} records)\n", store.display()));
    out
}

/// Event table, one line per record.
pub fn format_records(records: &[Record]) -> String {
    let mut out = String::new();
    out.push_str(
        format!(
            "{:<25} {:<4} {:<7} {:<32} {:>9} {:>9} {:>9} {:<3}\n",
            "time", "cur", "impact", "event", "actual", "forecast", "previous", "det"
        )
        .trim_end(),
    );
    out.push('\n');

    out.push_str(
        format!(
            "{:-<25} {:-<4} {:-<7} {:-<32} {:-<9} {:-<9} {:-<9} {:-<3}\n",
            "", "", "", "", "", "", "", ""
        )
        .trim_end(),
    );
    out.push('\n');

    for r in records {
        out.push_str(
            format!(
                "{:<25} {:<4} {:<7} {:<32} {:>9} {:>9} {:>9} {:<3}\n",
                r.time.to_rfc3339(),
                r.currency.code(),
                r.impact.as_str(),
                truncate(&r.event_name, 32),
                truncate(r.actual.as_deref().unwrap_or(""), 9),
                truncate(r.forecast.as_deref().unwrap_or(""), 9),
                truncate(r.previous.as_deref().unwrap_or(""), 9),
                if r.has_detail() { "yes" } else { "" },
            )
            .trim_end(),
        );
        out.push('\n');
    }

    out
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out = String::new();
    for (i, ch) in s.chars().enumerate() {
        if i + 1 >= max {
            break;
        }
        out.push(ch);
    }
    out.push('.');
    out
}
