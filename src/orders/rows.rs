use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::orders::record::{OrderRecord, OrderRow};
use crate::query::OrderQuery;

/// Re-applies the caller's date window and status to upstream results,
/// for tenants where upstream ignores those filters.
#[derive(Debug, Clone, Default)]
pub struct FallbackFilter {
    date_window: Option<(String, String)>,
    execution_status: Option<String>,
}

impl FallbackFilter {
    pub fn from_query(query: &OrderQuery) -> Self {
        let date_window = match (&query.date_from, &query.date_to) {
            (Some(from), Some(to)) => Some((from.clone(), to.clone())),
            _ => None,
        };
        Self {
            date_window,
            execution_status: query.execution_status.clone(),
        }
    }

    pub fn keeps(&self, record: &OrderRecord) -> bool {
        if let Some((from, to)) = &self.date_window {
            let start = record.scheduled_start_date.as_deref().and_then(day);
            let end = record.scheduled_completion_date.as_deref().and_then(day);
            match (start, end) {
                (Some(start), Some(end)) if start >= from.as_str() && end <= to.as_str() => {}
                _ => return false,
            }
        }
        if let Some(status) = &self.execution_status {
            if record.execution_status.as_deref() != Some(status.as_str()) {
                return false;
            }
        }
        true
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct OrderRows {
    pub count: usize,
    pub rows: Vec<OrderRow>,
}

/// Maps the upstream `content` array to rows, dropping entries the filter rejects.
/// Entries that are not order objects are skipped.
pub fn to_rows(body: &Value, filter: &FallbackFilter) -> OrderRows {
    let records = body
        .get("content")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();

    let rows: Vec<OrderRow> = records
        .iter()
        .filter_map(|entry| {
            OrderRecord::deserialize(entry)
                .inspect_err(|e| warn!("skipping unreadable order record: {}", e))
                .ok()
        })
        .filter(|record| filter.keeps(record))
        .map(|record| OrderRow::from(&record))
        .collect();

    OrderRows {
        count: rows.len(),
        rows,
    }
}

/// `YYYY-MM-DD` prefix of an ISO timestamp.
fn day(timestamp: &str) -> Option<&str> {
    timestamp.get(..10)
}
