//! Task-ID extraction from provider payloads.

use serde_json::Value;

use crate::normalize::paths::{lookup, TASK_ID_PATHS};
use crate::types::TaskId;

/// Find the provider task ID in a webhook body or history record.
///
/// Checks the known ID fields in priority order; strings are trimmed and
/// numbers are rendered in decimal. Blank values are skipped.
pub fn extract_task_id(payload: &Value) -> Option<TaskId> {
    TASK_ID_PATHS
        .iter()
        .filter_map(|path| lookup(payload, path))
        .find_map(|value| match value {
            Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
}
