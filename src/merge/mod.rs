//! Reconciling a persisted dataset with newly observed records.
//!
//! Records are matched on their identity key. Observed values (`actual`,
//! `forecast`, `previous`, `impact`) always take the newer observation;
//! `detail` only ever goes from absent to present.

use std::collections::HashMap;

use crate::domain::{Dataset, IdentityKey, Record};

/// What a merge did to the existing dataset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeStats {
    /// Incoming records whose key was new.
    pub added: usize,
    /// Incoming records that changed an existing record.
    pub updated: usize,
}

pub fn merge(existing: Dataset, incoming: impl IntoIterator<Item = Record>) -> Dataset {
    merge_with_stats(existing, incoming).0
}

/// Merge `incoming` into `existing`.
///
/// Duplicate keys inside `incoming` collapse to their last occurrence before
/// being applied. Duplicate keys already present in `existing` (older files)
/// are folded together in file order, so the result is always unique.
pub fn merge_with_stats(existing: Dataset, incoming: impl IntoIterator<Item = Record>) -> (Dataset, MergeStats) {
    let mut merged = KeyedRecords::default();
    for record in existing.into_records() {
        merged.upsert(record);
    }

    let mut latest = KeyedRecords::default();
    for record in incoming {
        latest.replace(record);
    }

    let mut stats = MergeStats::default();
    for record in latest.records {
        match merged.upsert(record) {
            Upsert::Added => stats.added += 1,
            Upsert::Updated => stats.updated += 1,
            Upsert::Unchanged => {}
        }
    }

    (Dataset::from_records(merged.records), stats)
}

enum Upsert {
    Added,
    Updated,
    Unchanged,
}

/// Records in first-seen order plus a key index into them.
#[derive(Default)]
struct KeyedRecords {
    records: Vec<Record>,
    index: HashMap<IdentityKey, usize>,
}

impl KeyedRecords {
    fn upsert(&mut self, record: Record) -> Upsert {
        match self.index.get(&record.key()) {
            Some(&i) => {
                if apply_observation(&mut self.records[i], record) {
                    Upsert::Updated
                } else {
                    Upsert::Unchanged
                }
            }
            None => {
                self.index.insert(record.key(), self.records.len());
                self.records.push(record);
                Upsert::Added
            }
        }
    }

    fn replace(&mut self, record: Record) {
        match self.index.get(&record.key()) {
            Some(&i) => self.records[i] = record,
            None => {
                self.index.insert(record.key(), self.records.len());
                self.records.push(record);
            }
        }
    }
}

/// Apply a newer observation of the same event. Returns whether anything changed.
fn apply_observation(current: &mut Record, newer: Record) -> bool {
    let before = current.clone();
    let newer_has_detail = newer.has_detail();

    current.impact = newer.impact;
    current.actual = newer.actual;
    current.forecast = newer.forecast;
    current.previous = newer.previous;
    if !current.has_detail() && newer_has_detail {
        current.detail = newer.detail;
    }
    current.has_detail_marker |= newer.has_detail_marker;

    *current != before
}
