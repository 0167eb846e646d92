//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - loads `.env` and parses CLI arguments
//! - sets up logging
//! - builds the run configuration and page session
//! - runs the scrape / parse / merge workflow
//! - prints the run summary

use std::time::Duration;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::browser::StaticPage;
use crate::cli::{Cli, Command, DetailArgs, MergeArgs, ParseArgs, ScrapeArgs};
use crate::domain::{Dataset, DayRange, ScrapeConfig};
use crate::error::AppError;
use crate::io::CsvStore;
use crate::retry::{RetryPolicy, Throttle};
use crate::scrape::RangeScraper;

pub mod pipeline;

/// Entry point for the `ffcal` binary.
pub async fn run() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    crate::logging::init(cli.verbose);

    match cli.command {
        Command::Scrape(args) => handle_scrape(args).await,
        Command::Parse(args) => handle_parse(args).await,
        Command::Merge(args) => handle_merge(args),
    }
}

async fn handle_scrape(args: ScrapeArgs) -> Result<(), AppError> {
    let range = day_range_from_args(&args)?;
    let config = scrape_config_from_args(&args);
    let store = CsvStore::new(&args.store.csv, args.store.utc_offset);

    let mut page = StaticPage::connect(Duration::from_millis(args.request_timeout_ms))
        .map_err(|e| AppError::new(4, format!("Failed to open a page session: {e}")))?;

    let out = pipeline::run_scrape(&mut page, &store, config, range, cancel_on_ctrl_c()).await?;

    println!(
        "{}",
        crate::report::format_scrape_summary(&range, &out.summary, store.path(), out.dataset.len())
    );
    Ok(())
}

async fn handle_parse(args: ParseArgs) -> Result<(), AppError> {
    let html = std::fs::read_to_string(&args.html)
        .map_err(|e| AppError::new(2, format!("Failed to read page '{}': {e}", args.html.display())))?;
    let range = DayRange::single(args.date);
    let config = parse_config_from_args(&args);
    let store = CsvStore::new(&args.store.csv, args.store.utc_offset);
    let mut page = StaticPage::from_html(html);

    let out = if args.no_save {
        RangeScraper::new(config, CancellationToken::new())
            .run(&mut page, Dataset::new(), range)
            .await
    } else {
        pipeline::run_scrape(&mut page, &store, config, range, CancellationToken::new()).await?
    };

    let offset = args.store.utc_offset;
    let day_records: Vec<_> = out
        .dataset
        .iter()
        .filter(|r| r.time.with_timezone(&offset).date_naive() == args.date)
        .cloned()
        .collect();
    println!("{}", crate::report::format_records(&day_records));
    println!(
        "{}",
        crate::report::format_scrape_summary(&range, &out.summary, store.path(), out.dataset.len())
    );
    Ok(())
}

fn handle_merge(args: MergeArgs) -> Result<(), AppError> {
    let store = CsvStore::new(&args.store.csv, args.store.utc_offset);
    let run = pipeline::run_merge(&args.incoming, &store)?;
    println!(
        "{}",
        crate::report::format_merge_summary(&args.incoming, run.incoming_read, &run.stats, store.path(), run.total)
    );
    Ok(())
}

pub fn day_range_from_args(args: &ScrapeArgs) -> Result<DayRange, AppError> {
    let end = args.end.unwrap_or(args.start);
    DayRange::new(args.start, end)
        .ok_or_else(|| AppError::new(2, format!("--end ({end}) is before --start ({}).", args.start)))
}

pub fn scrape_config_from_args(args: &ScrapeArgs) -> ScrapeConfig {
    let defaults = ScrapeConfig::default();
    ScrapeConfig {
        utc_offset: args.store.utc_offset,
        details: args.detail.details,
        render_timeout: Duration::from_millis(args.render_timeout_ms),
        day_retry: RetryPolicy::new(
            args.day_attempts,
            defaults.day_retry.base_delay,
            defaults.day_retry.max_delay,
        ),
        detail_retry: detail_policy(&args.detail, &defaults),
        detail_timeout: Duration::from_millis(args.detail.detail_timeout_ms),
        throttle: Throttle {
            base: Duration::from_millis(args.throttle_ms),
            jitter: Duration::from_millis(args.jitter_ms),
        },
        debug_dir: args.debug_dir.clone(),
    }
}

/// Offline replay: one attempt (reloading a saved page changes nothing), no throttle.
pub fn parse_config_from_args(args: &ParseArgs) -> ScrapeConfig {
    let defaults = ScrapeConfig::default();
    ScrapeConfig {
        utc_offset: args.store.utc_offset,
        details: args.detail.details,
        day_retry: RetryPolicy::new(1, Duration::ZERO, Duration::ZERO),
        detail_retry: detail_policy(&args.detail, &defaults),
        detail_timeout: Duration::from_millis(args.detail.detail_timeout_ms),
        throttle: Throttle::none(),
        ..defaults
    }
}

fn detail_policy(args: &DetailArgs, defaults: &ScrapeConfig) -> RetryPolicy {
    RetryPolicy::new(
        args.detail_attempts,
        defaults.detail_retry.base_delay,
        defaults.detail_retry.max_delay,
    )
}

/// Token cancelled on the first Ctrl-C; the scrape stops before the next day.
fn cancel_on_ctrl_c() -> CancellationToken {
    let token = CancellationToken::new();
    let child = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, stopping after the current day");
            child.cancel();
        }
    });
    token
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn scrape_args_map_to_config() {
        let cli = Cli::parse_from([
            "ffcal",
            "scrape",
            "--start",
            "2025-11-24",
            "--end",
            "2025-11-28",
            "--details",
            "--day-attempts",
            "3",
            "--throttle-ms",
            "0",
            "--jitter-ms",
            "0",
        ]);
        let Command::Scrape(args) = cli.command else {
            panic!("expected scrape");
        };

        let range = day_range_from_args(&args).unwrap();
        assert_eq!(range.len(), 5);

        let config = scrape_config_from_args(&args);
        assert!(config.details);
        assert_eq!(config.day_retry.max_attempts, 3);
        assert_eq!(config.throttle, Throttle::none());
        assert_eq!(config.render_timeout, Duration::from_secs(10));
    }

    #[test]
    fn reversed_range_is_rejected() {
        let cli = Cli::parse_from(["ffcal", "scrape", "--start", "2025-11-24", "--end", "2025-11-20"]);
        let Command::Scrape(args) = cli.command else {
            panic!("expected scrape");
        };
        let err = day_range_from_args(&args).unwrap_err();
        assert_eq!(err.exit_code(), 2);
        assert_eq!(args.start, NaiveDate::from_ymd_opt(2025, 11, 24).unwrap());
    }
}
