//! Parsing of the provider's record-history listing.

use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;

use dancegen_core::normalize::paths::{lookup, FieldPath};
use dancegen_core::task_id::extract_task_id;
use dancegen_core::types::{TaskId, Timestamp};

/// Where the record array sits in a history response.
const RECORD_LIST_PATHS: &[FieldPath] = &[
    &["data", "records"],
    &["data", "list"],
    &["data"],
    &["records"],
    &["list"],
];

/// Where a record's creation time sits.
const CREATED_AT_PATHS: &[FieldPath] = &[
    &["createTime"],
    &["created_at"],
    &["createdAt"],
    &["data", "createTime"],
];

/// Epoch values above this are milliseconds rather than seconds.
const MILLIS_THRESHOLD: i64 = 100_000_000_000;

/// One entry from the history listing.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryRecord {
    pub task_id: TaskId,
    pub created_at: Option<Timestamp>,
    /// The raw record, handed to the normalizer as-is.
    pub payload: Value,
}

/// Extract every record carrying a task ID from a history page response.
pub fn parse_records(page: &Value) -> Vec<HistoryRecord> {
    let Some(items) = RECORD_LIST_PATHS
        .iter()
        .filter_map(|path| lookup(page, path))
        .find_map(Value::as_array)
    else {
        return Vec::new();
    };

    items
        .iter()
        .filter_map(|item| {
            let task_id = extract_task_id(item)?;
            Some(HistoryRecord {
                task_id,
                created_at: created_at(item),
                payload: item.clone(),
            })
        })
        .collect()
}

fn created_at(record: &Value) -> Option<Timestamp> {
    CREATED_AT_PATHS
        .iter()
        .filter_map(|path| lookup(record, path))
        .find_map(parse_timestamp)
}

/// Accept epoch seconds, epoch milliseconds (numbers or numeric strings)
/// and RFC 3339 strings.
fn parse_timestamp(value: &Value) -> Option<Timestamp> {
    match value {
        Value::Number(n) => n.as_i64().and_then(from_epoch),
        Value::String(s) => {
            let s = s.trim();
            match s.parse::<i64>() {
                Ok(epoch) => from_epoch(epoch),
                Err(_) => DateTime::parse_from_rfc3339(s)
                    .ok()
                    .map(|dt| dt.with_timezone(&Utc)),
            }
        }
        _ => None,
    }
}

fn from_epoch(epoch: i64) -> Option<Timestamp> {
    if epoch > MILLIS_THRESHOLD {
        Utc.timestamp_millis_opt(epoch).single()
    } else {
        Utc.timestamp_opt(epoch, 0).single()
    }
}
