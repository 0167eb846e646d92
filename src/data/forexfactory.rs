//! ForexFactory calendar: URLs and the markup the extractor relies on.
//!
//! The site's markup changes without notice, so every selector the scraper
//! touches lives here.

use chrono::NaiveDate;

pub const BASE_URL: &str = "https://www.forexfactory.com/calendar";

/// CSS selectors for the calendar table.
pub mod selectors {
    pub const TABLE: &str = "table.calendar__table";
    pub const ROW: &str = "tr.calendar__row";
    /// Rows carrying a real event; used as the "events exist" indicator.
    pub const EVENT_ROW: &str = "tr[data-event-id]";

    pub const TIME: &str = "td.calendar__time";
    pub const CURRENCY: &str = "td.calendar__currency";
    pub const IMPACT_CELL: &str = "td.calendar__impact";
    pub const IMPACT_ICON: &str = "td.calendar__impact span";
    pub const EVENT: &str = "td.calendar__event";
    pub const ACTUAL: &str = "td.calendar__actual";
    pub const FORECAST: &str = "td.calendar__forecast";
    pub const PREVIOUS: &str = "td.calendar__previous";
    pub const DETAIL_LINK: &str = "td.calendar__detail a";

    pub const DETAIL_ROW: &str = "tr.calendar__details--detail";
    pub const SPEC_TABLE: &str = "table.calendarspecs";
}

/// Row classes that separate days or mark an empty day.
pub const SEPARATOR_CLASSES: [&str; 2] = ["day-breaker", "no-event"];

pub fn is_separator_row(class_name: &str) -> bool {
    SEPARATOR_CLASSES.iter().any(|c| class_name.contains(c))
}

/// Calendar URL for an inclusive day range.
///
/// A single day uses `?day=nov24.2025`; longer spans use
/// `?range=nov24.2025-nov30.2025`.
pub fn calendar_url(start: NaiveDate, end: NaiveDate) -> String {
    if start == end {
        format!("{BASE_URL}?day={}", url_day(start))
    } else {
        format!("{BASE_URL}?range={}-{}", url_day(start), url_day(end))
    }
}

fn url_day(date: NaiveDate) -> String {
    date.format("%b%d.%Y").to_string().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_day_url() {
        let d = NaiveDate::from_ymd_opt(2025, 11, 24).unwrap();
        assert_eq!(calendar_url(d, d), "https://www.forexfactory.com/calendar?day=nov24.2025");
    }

    #[test]
    fn range_url_pads_days() {
        let a = NaiveDate::from_ymd_opt(2025, 3, 3).unwrap();
        let b = NaiveDate::from_ymd_opt(2025, 3, 9).unwrap();
        assert_eq!(
            calendar_url(a, b),
            "https://www.forexfactory.com/calendar?range=mar03.2025-mar09.2025"
        );
    }

    #[test]
    fn separators() {
        assert!(is_separator_row("calendar__row calendar__row--day-breaker"));
        assert!(is_separator_row("calendar__row calendar__row--no-event"));
        assert!(!is_separator_row("calendar__row calendar_row--grey"));
    }
}
