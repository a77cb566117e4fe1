//! Field-path tables probed by the normalizer, in priority order.
//!
//! The provider's payload shape is undocumented and has drifted over time;
//! every path below has been observed in a webhook body or a status-query
//! response. Order matters: the first non-empty hit wins.

use serde_json::Value;

/// A dotted path into a JSON object, one segment per key.
pub type FieldPath = &'static [&'static str];

/// String (or occasionally numeric) status labels.
pub const STATUS_LABEL_PATHS: &[FieldPath] = &[
    &["data", "status"],
    &["status"],
    &["data", "state"],
    &["state"],
];

/// Numeric success flags (`0` running, `1` done, `2`/`3` failed).
pub const SUCCESS_FLAG_PATHS: &[FieldPath] = &[&["data", "successFlag"], &["successFlag"]];

/// Fields that may carry result URLs, either directly or embedded as JSON.
pub const RESULT_URL_PATHS: &[FieldPath] = &[
    &["data", "response", "resultUrls"],
    &["data", "response", "result_urls"],
    &["response", "resultUrls"],
    &["response", "result_urls"],
    &["data", "info", "resultUrls"],
    &["data", "info", "result_urls"],
    &["data", "resultUrls"],
    &["data", "result_urls"],
    &["resultUrls"],
    &["result_urls"],
    &["data", "image_urls"],
    &["image_urls"],
    &["data", "resultJson"],
    &["resultJson"],
    &["data", "response"],
    &["response"],
    &["data", "resultUrl"],
    &["resultUrl"],
    &["data", "video_url"],
    &["video_url"],
    &["data", "url"],
    &["url"],
];

/// Human-readable failure reasons.
pub const ERROR_PATHS: &[FieldPath] = &[
    &["error"],
    &["errorMessage"],
    &["data", "error"],
    &["data", "failMsg"],
    &["failMsg"],
    &["data", "failReason"],
];

/// Task identifiers.
pub const TASK_ID_PATHS: &[FieldPath] = &[
    &["data", "taskId"],
    &["taskId"],
    &["task_id"],
    &["data", "task_id"],
    &["data", "id"],
    &["id"],
];

/// Follow `path` through nested objects. Returns `None` as soon as a segment
/// is missing or the current value is not an object.
pub fn lookup<'a>(value: &'a Value, path: &[&str]) -> Option<&'a Value> {
    path.iter().try_fold(value, |current, key| current.get(*key))
}

/// First non-blank string found at any of `paths`, trimmed.
pub fn first_string(value: &Value, paths: &[FieldPath]) -> Option<String> {
    paths
        .iter()
        .filter_map(|path| lookup(value, path))
        .filter_map(Value::as_str)
        .map(str::trim)
        .find(|s| !s.is_empty())
        .map(str::to_string)
}
