//! Row extraction for one rendered calendar day.
//!
//! Each row is read through a `RowSource`. The structural source queries the
//! row's cells directly; when that fails the same row is re-read from an
//! in-page evaluation snapshot. A row that fails both ways is skipped and
//! counted.

use async_trait::async_trait;
use chrono::{FixedOffset, NaiveDate, NaiveTime};
use serde_json::Value;
use tracing::{debug, warn};

use crate::browser::{BrowserError, CalendarPage, RowHandle};
use crate::data::selectors;
use crate::domain::Record;
use crate::extract::fields::{RawRow, parse_row};
use crate::text::normalize_ws;

/// Named parts of a calendar row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    ClassName,
    Time,
    Currency,
    Impact,
    Event,
    Actual,
    Forecast,
    Previous,
    HasDetail,
}

impl Field {
    /// Key of this field in an evaluated row object.
    pub fn key(self) -> &'static str {
        match self {
            Field::ClassName => "className",
            Field::Time => "time",
            Field::Currency => "currency",
            Field::Impact => "impact",
            Field::Event => "event",
            Field::Actual => "actual",
            Field::Forecast => "forecast",
            Field::Previous => "previous",
            Field::HasDetail => "hasDetail",
        }
    }

    fn selector(self) -> Option<&'static str> {
        match self {
            Field::Time => Some(selectors::TIME),
            Field::Currency => Some(selectors::CURRENCY),
            Field::Event => Some(selectors::EVENT),
            Field::Actual => Some(selectors::ACTUAL),
            Field::Forecast => Some(selectors::FORECAST),
            Field::Previous => Some(selectors::PREVIOUS),
            Field::ClassName | Field::Impact | Field::HasDetail => None,
        }
    }
}

/// Read access to one row's fields, as text.
///
/// `HasDetail` reads as `"true"` or `"false"`.
#[async_trait]
pub trait RowSource: Send + Sync {
    async fn get_field(&self, field: Field) -> Result<String, BrowserError>;
}

/// Fields read by querying the row element's cells.
pub struct StructuralRow<'a> {
    handle: &'a dyn RowHandle,
}

impl<'a> StructuralRow<'a> {
    pub fn new(handle: &'a dyn RowHandle) -> Self {
        Self { handle }
    }
}

#[async_trait]
impl<'a> RowSource for StructuralRow<'a> {
    async fn get_field(&self, field: Field) -> Result<String, BrowserError> {
        match field {
            Field::ClassName => self.handle.class_name().await,
            Field::Impact => {
                let class = self.handle.attribute(selectors::IMPACT_ICON, "class").await?;
                let title = self.handle.attribute(selectors::IMPACT_ICON, "title").await?;
                Ok(normalize_ws(&format!(
                    "{} {}",
                    class.unwrap_or_default(),
                    title.unwrap_or_default()
                )))
            }
            Field::HasDetail => Ok(self.handle.exists(selectors::DETAIL_LINK).await?.to_string()),
            cell => match cell.selector() {
                Some(css) => self.handle.text(css).await,
                None => Err(BrowserError::NotFound(cell.key().to_string())),
            },
        }
    }
}

/// Fields read from an evaluated row object. Missing keys read as empty.
pub struct ScriptRow {
    value: Value,
}

impl ScriptRow {
    pub fn new(value: Value) -> Self {
        Self { value }
    }
}

#[async_trait]
impl RowSource for ScriptRow {
    async fn get_field(&self, field: Field) -> Result<String, BrowserError> {
        if !self.value.is_object() {
            return Err(BrowserError::Protocol(format!("row snapshot is not an object: {}", self.value)));
        }
        Ok(match &self.value[field.key()] {
            Value::Null => String::new(),
            Value::String(s) => normalize_ws(s),
            Value::Bool(b) => b.to_string(),
            other => other.to_string(),
        })
    }
}

/// Read every field of a row. Separator rows stop after the class name.
pub async fn read_row(source: &dyn RowSource) -> Result<RawRow, BrowserError> {
    let mut raw = RawRow {
        class_name: source.get_field(Field::ClassName).await?,
        ..RawRow::default()
    };
    if raw.is_separator() {
        return Ok(raw);
    }
    raw.time = source.get_field(Field::Time).await?;
    raw.currency = source.get_field(Field::Currency).await?;
    raw.impact = source.get_field(Field::Impact).await?;
    raw.event = source.get_field(Field::Event).await?;
    raw.actual = source.get_field(Field::Actual).await?;
    raw.forecast = source.get_field(Field::Forecast).await?;
    raw.previous = source.get_field(Field::Previous).await?;
    raw.has_detail = source.get_field(Field::HasDetail).await? == "true";
    Ok(raw)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RowStats {
    pub parsed: usize,
    /// Rows that could not be read or parsed.
    pub skipped: usize,
    /// Rows read from an evaluation snapshot instead of structurally.
    pub script_fallbacks: usize,
}

/// A parsed record plus the position of its row on the page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedRow {
    pub index: usize,
    pub record: Record,
}

enum Rows {
    Structural(std::vec::IntoIter<Box<dyn RowHandle>>),
    Script(std::vec::IntoIter<Value>),
}

/// One-pass cursor over the rows of the rendered day.
///
/// Row handles are consumed as the cursor advances; extracting again needs a
/// fresh rendering and a new cursor.
pub struct DayRows<'p, P: CalendarPage + ?Sized> {
    page: &'p mut P,
    rows: Rows,
    date: NaiveDate,
    offset: FixedOffset,
    index: usize,
    carry: Option<NaiveTime>,
    stats: RowStats,
}

impl<'p, P: CalendarPage + ?Sized> DayRows<'p, P> {
    /// List the day's rows. Falls back to one evaluation of the whole table
    /// when the rows cannot be listed structurally.
    pub async fn open(page: &'p mut P, date: NaiveDate, offset: FixedOffset) -> Result<Self, BrowserError> {
        let rows = match page.rows().await {
            Ok(handles) => Rows::Structural(handles.into_iter()),
            Err(err) => {
                warn!(%date, "row listing failed, reading the day by evaluation: {err}");
                Rows::Script(page.evaluate_rows().await?.into_iter())
            }
        };
        Ok(Self {
            page,
            rows,
            date,
            offset,
            index: 0,
            carry: None,
            stats: RowStats::default(),
        })
    }

    pub fn stats(&self) -> RowStats {
        self.stats
    }

    /// Next parsed record, or `None` once the rows are exhausted.
    pub async fn next(&mut self) -> Option<ExtractedRow> {
        loop {
            let index = self.index;
            let read = match &mut self.rows {
                Rows::Structural(handles) => {
                    let handle = handles.next()?;
                    match read_row(&StructuralRow::new(handle.as_ref())).await {
                        Ok(raw) => Ok(raw),
                        Err(err) => {
                            debug!(row = index, "structural read failed, evaluating row: {err}");
                            self.stats.script_fallbacks += 1;
                            match self.page.evaluate_row(index).await {
                                Ok(value) => read_row(&ScriptRow::new(value)).await,
                                Err(script_err) => Err(script_err),
                            }
                        }
                    }
                }
                Rows::Script(values) => {
                    let value = values.next()?;
                    self.stats.script_fallbacks += 1;
                    read_row(&ScriptRow::new(value)).await
                }
            };
            self.index += 1;

            let raw = match read {
                Ok(raw) => raw,
                Err(err) => {
                    warn!(date = %self.date, row = index, "row unreadable, skipping: {err}");
                    self.stats.skipped += 1;
                    // Its time cell is unknown, so later blank cells have nothing to inherit.
                    self.carry = None;
                    continue;
                }
            };

            match parse_row(&raw, self.date, self.offset, &mut self.carry) {
                Ok(Some(record)) => {
                    debug!(row = index, event = %record.event_name, time = %record.time, "parsed row");
                    self.stats.parsed += 1;
                    return Some(ExtractedRow { index, record });
                }
                Ok(None) => {}
                Err(err) => {
                    warn!(date = %self.date, row = index, "row skipped: {err}");
                    self.stats.skipped += 1;
                }
            }
        }
    }
}

/// Everything one pass over a day produced.
#[derive(Debug, Clone, Default)]
pub struct DayExtraction {
    pub rows: Vec<ExtractedRow>,
    pub stats: RowStats,
}

/// Drain a fresh cursor over the rendered day.
pub async fn extract_day<P: CalendarPage + ?Sized>(
    page: &mut P,
    date: NaiveDate,
    offset: FixedOffset,
) -> Result<DayExtraction, BrowserError> {
    let mut cursor = DayRows::open(page, date, offset).await?;
    let mut rows = Vec::new();
    while let Some(row) = cursor.next().await {
        rows.push(row);
    }
    Ok(DayExtraction {
        rows,
        stats: cursor.stats(),
    })
}
