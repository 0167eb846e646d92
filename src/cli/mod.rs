//! Command-line parsing for the calendar scraper.
//!
//! Parsing and dispatch stay separate from scraping: this module only turns
//! argv (and `FFCAL_*` environment variables) into typed arguments.

use std::path::PathBuf;

use chrono::{FixedOffset, NaiveDate};
use clap::{ArgAction, Args, Parser, Subcommand};

use crate::domain::parse_utc_offset;

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "ffcal", version, about = "ForexFactory economic calendar scraper")]
pub struct Cli {
    /// More log output (-v debug, -vv trace). `RUST_LOG` overrides.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Scrape a date range and merge it into the dataset.
    Scrape(ScrapeArgs),
    /// Extract events from a saved calendar page (e.g. a debug snapshot).
    Parse(ParseArgs),
    /// Merge another dataset file into the dataset.
    Merge(MergeArgs),
}

/// Where the dataset lives and how its times are read.
#[derive(Debug, Args, Clone)]
pub struct StoreArgs {
    /// Dataset CSV, created if missing.
    #[arg(long = "csv", env = "FFCAL_CSV", default_value = "forexfactory_calendar.csv")]
    pub csv: PathBuf,

    /// UTC offset of the times shown on the site (e.g. -05:00).
    #[arg(long, env = "FFCAL_UTC_OFFSET", default_value = "+00:00", value_parser = parse_utc_offset, allow_hyphen_values = true)]
    pub utc_offset: FixedOffset,
}

/// Detail-pass options shared by `scrape` and `parse`.
#[derive(Debug, Args, Clone)]
pub struct DetailArgs {
    /// Expand rows with a detail link and store their specification table.
    #[arg(long, env = "FFCAL_DETAILS")]
    pub details: bool,

    /// Attempts per detail expansion.
    #[arg(long, default_value_t = 3)]
    pub detail_attempts: u32,

    /// Wait for an expanded detail table (milliseconds).
    #[arg(long, default_value_t = 3_000)]
    pub detail_timeout_ms: u64,
}

#[derive(Debug, Args, Clone)]
pub struct ScrapeArgs {
    /// First day to scrape (YYYY-MM-DD).
    #[arg(long)]
    pub start: NaiveDate,

    /// Last day to scrape, inclusive. Defaults to `--start`.
    #[arg(long)]
    pub end: Option<NaiveDate>,

    #[command(flatten)]
    pub store: StoreArgs,

    #[command(flatten)]
    pub detail: DetailArgs,

    /// Wait for the calendar table to render (milliseconds).
    #[arg(long, env = "FFCAL_RENDER_TIMEOUT_MS", default_value_t = 10_000)]
    pub render_timeout_ms: u64,

    /// HTTP request timeout (milliseconds).
    #[arg(long, env = "FFCAL_REQUEST_TIMEOUT_MS", default_value_t = 30_000)]
    pub request_timeout_ms: u64,

    /// Attempts per day; each attempt after the first reloads the page.
    #[arg(long, default_value_t = 2)]
    pub day_attempts: u32,

    /// Fixed pause between days (milliseconds).
    #[arg(long, env = "FFCAL_THROTTLE_MS", default_value_t = 1_500)]
    pub throttle_ms: u64,

    /// Extra random pause between days, up to this many milliseconds.
    #[arg(long, env = "FFCAL_JITTER_MS", default_value_t = 1_000)]
    pub jitter_ms: u64,

    /// Directory for raw pages of failed days.
    #[arg(long, env = "FFCAL_DEBUG_DIR", default_value = "debug")]
    pub debug_dir: PathBuf,
}

#[derive(Debug, Args, Clone)]
pub struct ParseArgs {
    /// Saved calendar page (HTML).
    #[arg(long)]
    pub html: PathBuf,

    /// Calendar day the page shows (YYYY-MM-DD).
    #[arg(long)]
    pub date: NaiveDate,

    #[command(flatten)]
    pub store: StoreArgs,

    #[command(flatten)]
    pub detail: DetailArgs,

    /// Print the events without touching the dataset.
    #[arg(long)]
    pub no_save: bool,
}

#[derive(Debug, Args, Clone)]
pub struct MergeArgs {
    /// Dataset CSV to merge in.
    #[arg(long)]
    pub incoming: PathBuf,

    #[command(flatten)]
    pub store: StoreArgs,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn scrape_defaults() {
        let cli = Cli::parse_from(["ffcal", "-v", "scrape", "--start", "2025-11-24", "--utc-offset", "-05:00"]);
        assert_eq!(cli.verbose, 1);
        let Command::Scrape(args) = cli.command else {
            panic!("expected scrape");
        };
        assert_eq!(args.start, NaiveDate::from_ymd_opt(2025, 11, 24).unwrap());
        assert_eq!(args.end, None);
        assert_eq!(args.store.utc_offset, FixedOffset::west_opt(5 * 3600).unwrap());
        assert_eq!(args.day_attempts, 2);
        assert!(!args.detail.details);
    }

    #[test]
    fn bad_offset_is_rejected() {
        let res = Cli::try_parse_from(["ffcal", "merge", "--incoming", "a.csv", "--utc-offset", "EST"]);
        assert!(res.is_err());
    }
}
