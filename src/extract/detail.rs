//! Detail (specification table) extraction for rows that offer one.

use std::time::Duration;

use tracing::{debug, warn};

use crate::browser::CalendarPage;
use crate::domain::Record;
use crate::error::DetailError;
use crate::retry::RetryPolicy;
use crate::text::normalize_ws;

/// Serialize specification pairs as `key: value|key: value`.
///
/// Keys and values are whitespace-collapsed and rows with an empty key are
/// dropped. A repeated key keeps its first position and takes the last value.
/// Separator characters inside values are written as-is.
pub fn serialize_detail(pairs: &[(String, String)]) -> String {
    let mut merged: Vec<(String, String)> = Vec::with_capacity(pairs.len());
    for (key, value) in pairs {
        let key = normalize_ws(key);
        if key.is_empty() {
            continue;
        }
        let value = normalize_ws(value);
        match merged.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => merged.push((key, value)),
        }
    }

    merged
        .iter()
        .map(|(k, v)| format!("{k}: {v}"))
        .collect::<Vec<_>>()
        .join("|")
}

#[derive(Debug, Clone, Copy)]
pub struct DetailExtractor {
    policy: RetryPolicy,
    wait: Duration,
}

impl DetailExtractor {
    pub fn new(policy: RetryPolicy, wait: Duration) -> Self {
        Self { policy, wait }
    }

    /// Expand row `index`, read its table, and close it again.
    ///
    /// Timeouts and stale rows are retried per the policy. `None` once the
    /// attempts are spent or on a permanent failure.
    pub async fn fetch<P: CalendarPage + ?Sized>(&self, page: &mut P, index: usize) -> Option<String> {
        let wait = self.wait;
        let result = self
            .policy
            .run("detail expansion", page, |page, attempt| {
                Box::pin(async move {
                    debug!(row = index, attempt, "expanding detail");
                    page.expand_detail(index).await?;
                    let table = page.detail_table(wait).await;
                    if let Err(err) = page.close_detail().await {
                        debug!(row = index, "closing detail failed: {err}");
                    }
                    Ok::<_, DetailError>(table?)
                })
            })
            .await;

        match result {
            Ok(pairs) => Some(serialize_detail(&pairs)),
            Err(err) => {
                warn!(row = index, "detail unavailable: {err}");
                None
            }
        }
    }

    /// Fill `record.detail` from row `index`. Returns `false` when the detail
    /// could not be read; the record is left untouched then.
    pub async fn enrich<P: CalendarPage + ?Sized>(&self, page: &mut P, record: &mut Record, index: usize) -> bool {
        match self.fetch(page, index).await {
            Some(detail) => {
                if !detail.is_empty() {
                    record.detail = Some(detail);
                }
                true
            }
            None => false,
        }
    }
}
