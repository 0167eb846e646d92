//! Turning raw row text into a `Record`.
//!
//! Everything here is pure: the same `RawRow` and carried time always give the
//! same result, whichever extraction mode produced the text.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime};

use crate::data::is_separator_row;
use crate::domain::{Currency, Impact, Record};
use crate::error::RowParseError;
use crate::text::normalize_ws;

/// Field texts of one row, as read from the page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawRow {
    pub class_name: String,
    pub time: String,
    pub currency: String,
    pub impact: String,
    pub event: String,
    pub actual: String,
    pub forecast: String,
    pub previous: String,
    pub has_detail: bool,
}

impl RawRow {
    pub fn is_separator(&self) -> bool {
        is_separator_row(&self.class_name)
    }
}

/// Parse a time cell.
///
/// `Ok(None)` means the cell is empty and the row inherits the previous time.
pub fn parse_time_text(text: &str) -> Result<Option<NaiveTime>, RowParseError> {
    let t = normalize_ws(text).to_ascii_lowercase();
    if t.is_empty() {
        return Ok(None);
    }

    let fixed = |h, m, s| NaiveTime::from_hms_opt(h, m, s).ok_or_else(|| RowParseError::BadTime(text.to_string()));
    if t == "all day" || t == "tentative" {
        return fixed(0, 0, 0).map(Some);
    }
    if t.contains("day") {
        // Multi-day events ("Day 1", "Day 2") sort after the day's timed events.
        return fixed(23, 59, 59).map(Some);
    }
    if t.contains("data") {
        return fixed(0, 0, 1).map(Some);
    }

    parse_clock(&t)
        .map(Some)
        .ok_or_else(|| RowParseError::BadTime(text.to_string()))
}

/// `8:30am`, `12:00pm`, or a 24-hour `13:30`.
fn parse_clock(t: &str) -> Option<NaiveTime> {
    let (body, meridiem) = if let Some(b) = t.strip_suffix("am") {
        (b.trim_end(), Some(false))
    } else if let Some(b) = t.strip_suffix("pm") {
        (b.trim_end(), Some(true))
    } else {
        (t, None)
    };

    let (h, m) = body.split_once(':')?;
    let hour: u32 = h.parse().ok()?;
    let minute: u32 = m.parse().ok()?;
    let hour = match meridiem {
        Some(pm) => {
            if !(1..=12).contains(&hour) {
                return None;
            }
            (hour % 12) + if pm { 12 } else { 0 }
        }
        None => hour,
    };
    NaiveTime::from_hms_opt(hour, minute, 0)
}

fn optional(text: &str) -> Option<String> {
    let t = normalize_ws(text);
    (!t.is_empty()).then_some(t)
}

/// Build a record from one row.
///
/// `carry` holds the last explicit time seen on this day and is updated
/// whenever the row shows one, even if the rest of the row fails to parse.
/// An unreadable time clears it.
/// Separator rows and fully blank rows give `Ok(None)`.
pub fn parse_row(
    raw: &RawRow,
    date: NaiveDate,
    offset: FixedOffset,
    carry: &mut Option<NaiveTime>,
) -> Result<Option<Record>, RowParseError> {
    if raw.is_separator() {
        return Ok(None);
    }

    let event = normalize_ws(&raw.event);
    let currency_text = normalize_ws(&raw.currency);

    match parse_time_text(&raw.time) {
        Ok(Some(explicit)) => *carry = Some(explicit),
        Ok(None) => {}
        Err(err) => {
            // Later blank cells belong to this unknown slot.
            *carry = None;
            return Err(err);
        }
    }

    if event.is_empty() {
        if currency_text.is_empty() {
            return Ok(None);
        }
        return Err(RowParseError::EmptyEvent(currency_text));
    }

    let time = (*carry).ok_or(RowParseError::NoTime)?;
    let currency: Currency = currency_text.parse().map_err(RowParseError::UnknownCurrency)?;

    let mut record = Record::new(local_time(date, time, offset)?, currency, Impact::from_marker(&raw.impact), event);
    record.actual = optional(&raw.actual);
    record.forecast = optional(&raw.forecast);
    record.previous = optional(&raw.previous);
    record.has_detail_marker = raw.has_detail;
    Ok(Some(record))
}

fn local_time(date: NaiveDate, time: NaiveTime, offset: FixedOffset) -> Result<DateTime<FixedOffset>, RowParseError> {
    date.and_time(time)
        .and_local_timezone(offset)
        .single()
        .ok_or_else(|| RowParseError::BadTime(time.to_string()))
}
