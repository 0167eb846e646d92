//! Scriptable in-memory page for tests.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};

use crate::browser::{BrowserError, CalendarPage, RowHandle};
use crate::data::selectors;

#[derive(Debug, Clone, Default)]
pub(crate) struct FakeRow {
    pub class_name: String,
    pub time: String,
    pub currency: String,
    pub impact: String,
    pub event: String,
    pub actual: String,
    pub forecast: String,
    pub previous: String,
    pub has_detail: bool,
    pub detail: Vec<(String, String)>,
    /// Structural queries on this row fail with this error.
    pub structural_error: Option<BrowserError>,
    /// Script evaluation of this row fails with this error.
    pub script_error: Option<BrowserError>,
    /// `detail_table` times out this many times before answering.
    pub detail_timeouts: u32,
}

impl FakeRow {
    pub fn event(time: &str, currency: &str, impact: &str, event: &str) -> Self {
        Self {
            class_name: "calendar__row".to_string(),
            time: time.to_string(),
            currency: currency.to_string(),
            impact: impact.to_string(),
            event: event.to_string(),
            ..Self::default()
        }
    }

    pub fn breaker() -> Self {
        Self {
            class_name: "calendar__row calendar__row--day-breaker".to_string(),
            ..Self::default()
        }
    }

    pub fn with_detail(mut self, pairs: &[(&str, &str)]) -> Self {
        self.has_detail = true;
        self.detail = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        self
    }

    fn snapshot(&self) -> Value {
        json!({
            "className": self.class_name,
            "time": self.time,
            "currency": self.currency,
            "impact": self.impact,
            "event": self.event,
            "actual": self.actual,
            "forecast": self.forecast,
            "previous": self.previous,
            "hasDetail": self.has_detail,
        })
    }
}

#[derive(Debug, Clone, Default)]
pub(crate) struct FakeDay {
    pub rows: Vec<FakeRow>,
    /// Overrides the event indicator; defaults to the number of event rows.
    pub expected: Option<usize>,
    /// `wait_for_table` times out this many times before succeeding.
    pub render_timeouts: u32,
    /// `rows()` fails with this error (structural listing unavailable).
    pub rows_error: Option<BrowserError>,
}

impl FakeDay {
    pub fn with_rows(rows: Vec<FakeRow>) -> Self {
        Self {
            rows,
            ..Self::default()
        }
    }
}

#[derive(Debug, Default)]
pub(crate) struct FakePage {
    days: HashMap<String, FakeDay>,
    current: Option<String>,
    expanded: Option<usize>,
    pub navigations: Vec<String>,
    pub reloads: u32,
    pub expands: u32,
}

impl FakePage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_day(&mut self, url: impl Into<String>, day: FakeDay) {
        self.days.insert(url.into(), day);
    }

    fn day(&self) -> Result<&FakeDay, BrowserError> {
        let url = self
            .current
            .as_ref()
            .ok_or_else(|| BrowserError::Session("no page loaded".to_string()))?;
        self.days
            .get(url)
            .ok_or_else(|| BrowserError::Timeout(format!("render of {url}")))
    }

    fn day_mut(&mut self) -> Result<&mut FakeDay, BrowserError> {
        let url = self
            .current
            .clone()
            .ok_or_else(|| BrowserError::Session("no page loaded".to_string()))?;
        self.days
            .get_mut(&url)
            .ok_or_else(|| BrowserError::Timeout(format!("render of {url}")))
    }

    fn row(&self, index: usize) -> Result<&FakeRow, BrowserError> {
        self.day()?
            .rows
            .get(index)
            .ok_or_else(|| BrowserError::NotFound(format!("row {index}")))
    }
}

#[async_trait]
impl CalendarPage for FakePage {
    async fn navigate(&mut self, url: &str) -> Result<(), BrowserError> {
        self.navigations.push(url.to_string());
        self.current = Some(url.to_string());
        self.expanded = None;
        Ok(())
    }

    async fn reload(&mut self) -> Result<(), BrowserError> {
        self.reloads += 1;
        self.expanded = None;
        Ok(())
    }

    async fn wait_for_table(&mut self, _timeout: Duration) -> Result<(), BrowserError> {
        let day = self.day_mut()?;
        if day.render_timeouts > 0 {
            day.render_timeouts -= 1;
            return Err(BrowserError::Timeout("calendar table".to_string()));
        }
        Ok(())
    }

    async fn rows(&mut self) -> Result<Vec<Box<dyn RowHandle>>, BrowserError> {
        let day = self.day()?;
        if let Some(err) = &day.rows_error {
            return Err(err.clone());
        }
        Ok(day
            .rows
            .iter()
            .cloned()
            .map(|row| Box::new(FakeHandle { row }) as Box<dyn RowHandle>)
            .collect())
    }

    async fn evaluate_rows(&mut self) -> Result<Vec<Value>, BrowserError> {
        Ok(self.day()?.rows.iter().map(FakeRow::snapshot).collect())
    }

    async fn evaluate_row(&mut self, index: usize) -> Result<Value, BrowserError> {
        let row = self.row(index)?;
        match &row.script_error {
            Some(err) => Err(err.clone()),
            None => Ok(row.snapshot()),
        }
    }

    async fn expected_event_count(&mut self) -> Result<usize, BrowserError> {
        let day = self.day()?;
        Ok(day.expected.unwrap_or_else(|| {
            day.rows.iter().filter(|r| !r.event.is_empty()).count()
        }))
    }

    async fn expand_detail(&mut self, index: usize) -> Result<(), BrowserError> {
        self.expands += 1;
        if !self.row(index)?.has_detail {
            return Err(BrowserError::NotFound(format!("detail link on row {index}")));
        }
        self.expanded = Some(index);
        Ok(())
    }

    async fn detail_table(&mut self, _timeout: Duration) -> Result<Vec<(String, String)>, BrowserError> {
        let index = self
            .expanded
            .ok_or_else(|| BrowserError::NotFound("expanded row".to_string()))?;
        let row = self
            .day_mut()?
            .rows
            .get_mut(index)
            .ok_or_else(|| BrowserError::Stale(format!("row {index}")))?;
        if row.detail_timeouts > 0 {
            row.detail_timeouts -= 1;
            return Err(BrowserError::Timeout("detail table".to_string()));
        }
        Ok(row.detail.clone())
    }

    async fn close_detail(&mut self) -> Result<(), BrowserError> {
        self.expanded = None;
        Ok(())
    }

    async fn content(&mut self) -> Result<String, BrowserError> {
        let rows = self.day().map(|d| d.rows.len()).unwrap_or(0);
        Ok(format!("<html><!-- fake page with {rows} rows --></html>"))
    }
}

struct FakeHandle {
    row: FakeRow,
}

impl FakeHandle {
    fn check(&self) -> Result<(), BrowserError> {
        match &self.row.structural_error {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl RowHandle for FakeHandle {
    async fn class_name(&self) -> Result<String, BrowserError> {
        Ok(self.row.class_name.clone())
    }

    async fn text(&self, selector: &str) -> Result<String, BrowserError> {
        self.check()?;
        let text = match selector {
            selectors::TIME => &self.row.time,
            selectors::CURRENCY => &self.row.currency,
            selectors::EVENT => &self.row.event,
            selectors::ACTUAL => &self.row.actual,
            selectors::FORECAST => &self.row.forecast,
            selectors::PREVIOUS => &self.row.previous,
            selectors::IMPACT_CELL => &self.row.impact,
            other => return Err(BrowserError::NotFound(other.to_string())),
        };
        Ok(text.clone())
    }

    async fn attribute(&self, selector: &str, name: &str) -> Result<Option<String>, BrowserError> {
        self.check()?;
        match (selector, name) {
            (selectors::IMPACT_ICON, "class") => Ok(Some(self.row.impact.clone())),
            (selectors::IMPACT_ICON, _) => Ok(None),
            (other, _) => Err(BrowserError::NotFound(other.to_string())),
        }
    }

    async fn exists(&self, selector: &str) -> Result<bool, BrowserError> {
        self.check()?;
        Ok(selector == selectors::DETAIL_LINK && self.row.has_detail)
    }
}
