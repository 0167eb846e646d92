//! CSV persistence for the calendar dataset.
//!
//! On-disk shape is a flat table with the fixed header
//! `DateTime,Currency,Impact,Event,Actual,Forecast,Previous,Detail`.
//! `DateTime` is written as RFC 3339 with an explicit offset.
//!
//! Loading is lenient the same way row extraction is: a row that cannot be
//! parsed is reported with its line number and skipped, the rest still load.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, FixedOffset, NaiveDateTime};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::domain::{Currency, Dataset, Impact, Record};
use crate::error::AppError;

/// Load/save boundary for the persisted dataset.
pub trait DatasetStore {
    fn load(&self) -> Result<Dataset, AppError>;
    fn save(&self, dataset: &Dataset) -> Result<(), AppError>;
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct CsvRow {
    date_time: String,
    currency: String,
    #[serde(default)]
    impact: String,
    event: String,
    #[serde(default)]
    actual: Option<String>,
    #[serde(default)]
    forecast: Option<String>,
    #[serde(default)]
    previous: Option<String>,
    #[serde(default)]
    detail: Option<String>,
}

impl CsvRow {
    fn from_record(r: &Record) -> Self {
        Self {
            date_time: r.time.to_rfc3339(),
            currency: r.currency.code().to_string(),
            impact: r.impact.as_str().to_string(),
            event: r.event_name.clone(),
            actual: r.actual.clone(),
            forecast: r.forecast.clone(),
            previous: r.previous.clone(),
            detail: r.detail.clone(),
        }
    }

    fn into_record(self, offset: FixedOffset) -> Result<Record, String> {
        let time = parse_timestamp(&self.date_time, offset)?;
        let currency: Currency = self
            .currency
            .parse()
            .map_err(|code| format!("unknown currency '{code}'"))?;
        let event = self.event.trim();
        if event.is_empty() {
            return Err("empty Event".to_string());
        }

        let mut record = Record::new(time, currency, Impact::from_marker(&self.impact), event);
        record.actual = non_empty(self.actual);
        record.forecast = non_empty(self.forecast);
        record.previous = non_empty(self.previous);
        record.detail = non_empty(self.detail);
        Ok(record)
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// RFC 3339, `YYYY-MM-DD HH:MM:SS±HH:MM`, or a naive timestamp read in `offset`.
fn parse_timestamp(s: &str, offset: FixedOffset) -> Result<DateTime<FixedOffset>, String> {
    let s = s.trim();
    if let Ok(t) = DateTime::parse_from_rfc3339(s) {
        return Ok(t);
    }
    if let Ok(t) = DateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%:z") {
        return Ok(t);
    }

    const NAIVE_FORMATS: [&str; 3] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"];
    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .and_then(|naive| naive.and_local_timezone(offset).single())
        .ok_or_else(|| format!("invalid DateTime '{s}'"))
}

/// A row that was skipped while loading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowError {
    pub line: usize,
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct LoadReport {
    pub dataset: Dataset,
    pub row_errors: Vec<RowError>,
    pub rows_read: usize,
}

/// Dataset stored as one CSV file.
#[derive(Debug, Clone)]
pub struct CsvStore {
    path: PathBuf,
    /// Offset assumed for timestamps written without one.
    offset: FixedOffset,
}

impl CsvStore {
    pub fn new(path: impl Into<PathBuf>, offset: FixedOffset) -> Self {
        Self {
            path: path.into(),
            offset,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    /// Load with per-row diagnostics. A missing file is an empty dataset.
    pub fn load_report(&self) -> Result<LoadReport, AppError> {
        if !self.path.exists() {
            debug!(path = %self.path.display(), "no dataset file yet");
            return Ok(LoadReport {
                dataset: Dataset::new(),
                row_errors: Vec::new(),
                rows_read: 0,
            });
        }

        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::All)
            .from_path(&self.path)
            .map_err(|e| AppError::new(2, format!("Failed to open dataset '{}': {e}", self.path.display())))?;

        let mut records = Vec::new();
        let mut row_errors = Vec::new();
        let mut rows_read = 0usize;

        for (idx, result) in reader.deserialize::<CsvRow>().enumerate() {
            // Line 1 is the header.
            let line = idx + 2;
            rows_read += 1;

            let parsed = result
                .map_err(|e| format!("CSV parse error: {e}"))
                .and_then(|row| row.into_record(self.offset));
            match parsed {
                Ok(record) => records.push(record),
                Err(message) => row_errors.push(RowError { line, message }),
            }
        }

        Ok(LoadReport {
            dataset: Dataset::from_records(records),
            row_errors,
            rows_read,
        })
    }
}

impl DatasetStore for CsvStore {
    fn load(&self) -> Result<Dataset, AppError> {
        let report = self.load_report()?;
        for err in &report.row_errors {
            warn!(path = %self.path.display(), line = err.line, "skipped stored row: {}", err.message);
        }
        debug!(
            path = %self.path.display(),
            rows_read = report.rows_read,
            records = report.dataset.len(),
            "dataset loaded"
        );
        Ok(report.dataset)
    }

    /// Write to a sibling temp file, then rename over the target.
    fn save(&self, dataset: &Dataset) -> Result<(), AppError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .map_err(|e| AppError::new(2, format!("Failed to create '{}': {e}", parent.display())))?;
        }

        let tmp = temp_path(&self.path);
        let mut writer = csv::Writer::from_path(&tmp)
            .map_err(|e| AppError::new(2, format!("Failed to create '{}': {e}", tmp.display())))?;
        for record in dataset {
            writer
                .serialize(CsvRow::from_record(record))
                .map_err(|e| AppError::new(2, format!("Failed to write dataset row: {e}")))?;
        }
        writer
            .flush()
            .map_err(|e| AppError::new(2, format!("Failed to flush '{}': {e}", tmp.display())))?;
        drop(writer);

        fs::rename(&tmp, &self.path).map_err(|e| {
            AppError::new(
                2,
                format!("Failed to replace '{}' with '{}': {e}", self.path.display(), tmp.display()),
            )
        })?;
        debug!(path = %self.path.display(), records = dataset.len(), "dataset saved");
        Ok(())
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "dataset.csv".to_string());
    path.with_file_name(format!(".{name}.tmp"))
}
