//! Calendar event records and the dataset they are merged into.
//!
//! A `Record` is identified by `(time, currency, event)`; two records with the
//! same identity key are the same logical event observed at different times.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, FixedOffset};

/// Currencies listed on the calendar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Currency {
    Aud,
    Cad,
    Chf,
    Cny,
    Eur,
    Gbp,
    Jpy,
    Nzd,
    Usd,
    /// Site-wide events not tied to one currency.
    All,
}

impl Currency {
    pub const KNOWN: [Currency; 10] = [
        Currency::Aud,
        Currency::Cad,
        Currency::Chf,
        Currency::Cny,
        Currency::Eur,
        Currency::Gbp,
        Currency::Jpy,
        Currency::Nzd,
        Currency::Usd,
        Currency::All,
    ];

    pub fn code(self) -> &'static str {
        match self {
            Currency::Aud => "AUD",
            Currency::Cad => "CAD",
            Currency::Chf => "CHF",
            Currency::Cny => "CNY",
            Currency::Eur => "EUR",
            Currency::Gbp => "GBP",
            Currency::Jpy => "JPY",
            Currency::Nzd => "NZD",
            Currency::Usd => "USD",
            Currency::All => "ALL",
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Currency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let code = s.trim();
        Currency::KNOWN
            .into_iter()
            .find(|c| c.code().eq_ignore_ascii_case(code))
            .ok_or_else(|| code.to_string())
    }
}

/// Expected market impact of an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Impact {
    High,
    Medium,
    Low,
    Holiday,
    None,
}

impl Impact {
    /// Map an impact marker to a level.
    ///
    /// Accepts the row's icon class (`icon--ff-impact-red`), its title
    /// (`High Impact Expected`), or a stored level name (`HIGH`).
    /// Anything unrecognised is `None`, never an error.
    pub fn from_marker(marker: &str) -> Impact {
        let m = marker.to_ascii_lowercase();
        if m.contains("impact-red") || m.contains("high") {
            Impact::High
        } else if m.contains("impact-ora") || m.contains("medium") {
            Impact::Medium
        } else if m.contains("impact-yel") || m.contains("low") {
            Impact::Low
        } else if m.contains("impact-gra") || m.contains("holiday") || m.contains("non-economic") {
            Impact::Holiday
        } else {
            Impact::None
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Impact::High => "HIGH",
            Impact::Medium => "MEDIUM",
            Impact::Low => "LOW",
            Impact::Holiday => "HOLIDAY",
            Impact::None => "NONE",
        }
    }
}

impl fmt::Display for Impact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One calendar event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub time: DateTime<FixedOffset>,
    pub currency: Currency,
    pub impact: Impact,
    pub event_name: String,
    pub actual: Option<String>,
    pub forecast: Option<String>,
    pub previous: Option<String>,
    /// Serialized specification table (`key: value|key: value`).
    pub detail: Option<String>,
    /// The row offered an expandable detail link when it was scraped.
    ///
    /// Not persisted.
    pub has_detail_marker: bool,
}

impl Record {
    pub fn new(time: DateTime<FixedOffset>, currency: Currency, impact: Impact, event_name: impl Into<String>) -> Self {
        Self {
            time,
            currency,
            impact,
            event_name: event_name.into(),
            actual: None,
            forecast: None,
            previous: None,
            detail: None,
            has_detail_marker: false,
        }
    }

    pub fn key(&self) -> IdentityKey {
        IdentityKey {
            time: self.time,
            currency: self.currency,
            event: self.event_name.clone(),
        }
    }

    pub fn has_detail(&self) -> bool {
        self.detail.as_deref().is_some_and(|d| !d.trim().is_empty())
    }
}

/// `(time, currency, event)`: the identity of one logical event.
///
/// Times compare as instants, so the same moment written with two different
/// offsets is the same key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IdentityKey {
    pub time: DateTime<FixedOffset>,
    pub currency: Currency,
    pub event: String,
}

/// Ordered collection of records (ascending by time).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dataset {
    records: Vec<Record>,
}

impl Dataset {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a dataset, sorting by time. Duplicate keys are kept as-is;
    /// only `merge` establishes uniqueness.
    pub fn from_records(records: Vec<Record>) -> Self {
        let mut out = Self { records };
        out.sort_by_time();
        out
    }

    /// Stable sort, so records sharing a time keep their relative order.
    pub fn sort_by_time(&mut self) {
        self.records.sort_by_key(|r| r.time);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Record> {
        self.records.iter()
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn into_records(self) -> Vec<Record> {
        self.records
    }

    /// Binary search on time, then a scan of the records sharing that instant.
    pub fn get(&self, key: &IdentityKey) -> Option<&Record> {
        let start = self.records.partition_point(|r| r.time < key.time);
        self.records[start..]
            .iter()
            .take_while(|r| r.time == key.time)
            .find(|r| r.currency == key.currency && r.event_name == key.event)
    }

    /// The record with this key already carries a non-empty detail.
    pub fn has_detail(&self, key: &IdentityKey) -> bool {
        self.get(key).is_some_and(Record::has_detail)
    }
}

impl<'a> IntoIterator for &'a Dataset {
    type Item = &'a Record;
    type IntoIter = std::slice::Iter<'a, Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn currency_parses_case_insensitively() {
        assert_eq!("usd".parse::<Currency>().unwrap(), Currency::Usd);
        assert_eq!(" EUR ".parse::<Currency>().unwrap(), Currency::Eur);
        assert_eq!("All".parse::<Currency>().unwrap(), Currency::All);
        assert_eq!("XYZ".parse::<Currency>(), Err("XYZ".to_string()));
    }

    #[test]
    fn impact_from_markers() {
        assert_eq!(Impact::from_marker("icon icon--ff-impact-red"), Impact::High);
        assert_eq!(Impact::from_marker("icon icon--ff-impact-ora"), Impact::Medium);
        assert_eq!(Impact::from_marker("icon icon--ff-impact-yel"), Impact::Low);
        assert_eq!(Impact::from_marker("icon icon--ff-impact-gra"), Impact::Holiday);
        assert_eq!(Impact::from_marker("High Impact Expected"), Impact::High);
        assert_eq!(Impact::from_marker("Non-Economic"), Impact::Holiday);
        assert_eq!(Impact::from_marker("HOLIDAY"), Impact::Holiday);
        assert_eq!(Impact::from_marker(""), Impact::None);
        assert_eq!(Impact::from_marker("icon--ff-impact-blu"), Impact::None);
    }

    #[test]
    fn keys_compare_as_instants() {
        let ny = FixedOffset::west_opt(5 * 3600).unwrap();
        let utc = FixedOffset::east_opt(0).unwrap();
        let a = Record::new(ny.with_ymd_and_hms(2025, 11, 24, 8, 30, 0).unwrap(), Currency::Usd, Impact::High, "NFP");
        let b = Record::new(utc.with_ymd_and_hms(2025, 11, 24, 13, 30, 0).unwrap(), Currency::Usd, Impact::Low, "NFP");
        assert_eq!(a.key(), b.key());
    }

    #[test]
    fn lookup_by_key_among_shared_instants() {
        let ny = FixedOffset::west_opt(5 * 3600).unwrap();
        let utc = FixedOffset::east_opt(0).unwrap();
        let at = |h| ny.with_ymd_and_hms(2025, 11, 24, h, 30, 0).unwrap();
        let mut claims = Record::new(at(8), Currency::Usd, Impact::Medium, "Unemployment Claims");
        claims.detail = Some("Source: DOL".to_string());
        let ds = Dataset::from_records(vec![
            Record::new(at(10), Currency::Cad, Impact::Low, "Housing Starts"),
            Record::new(at(8), Currency::Usd, Impact::High, "Non-Farm Payrolls"),
            claims,
            Record::new(at(8), Currency::Cad, Impact::High, "Employment Change"),
            Record::new(at(2), Currency::Eur, Impact::Low, "German ifo"),
        ]);

        let key = IdentityKey {
            time: utc.with_ymd_and_hms(2025, 11, 24, 13, 30, 0).unwrap(),
            currency: Currency::Usd,
            event: "Unemployment Claims".to_string(),
        };
        assert_eq!(ds.get(&key).map(|r| r.impact), Some(Impact::Medium));
        assert!(ds.has_detail(&key));

        let nfp = IdentityKey {
            event: "Non-Farm Payrolls".to_string(),
            ..key.clone()
        };
        assert!(ds.get(&nfp).is_some());
        assert!(!ds.has_detail(&nfp));

        let later = IdentityKey { time: at(10), ..key };
        assert!(ds.get(&later).is_none());
    }

    #[test]
    fn blank_detail_is_not_detail() {
        let utc = FixedOffset::east_opt(0).unwrap();
        let mut r = Record::new(utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(), Currency::Gbp, Impact::Low, "CPI");
        assert!(!r.has_detail());
        r.detail = Some("  ".to_string());
        assert!(!r.has_detail());
        r.detail = Some("Source: ONS".to_string());
        assert!(r.has_detail());
    }
}
