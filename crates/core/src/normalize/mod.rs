//! Best-effort normalization of provider payloads.
//!
//! Webhook bodies and status-query responses come in many shapes. The
//! normalizer turns any of them into a `(status, result_urls, error)` triple:
//!
//! 1. Probe the known result fields in priority order ([`paths`]). String
//!    fields are parsed as embedded JSON and searched again; a non-JSON
//!    string starting with `http` counts as a single URL.
//! 2. Only when that finds nothing, scan every string leaf up to
//!    [`MAX_SCAN_DEPTH`] levels deep.
//! 3. Infer the status from labels or success flags, defaulting to
//!    `Success` when a URL was found and `Processing` otherwise.
//! 4. Pick up a failure reason for failed tasks.
//!
//! Normalization never fails; an empty or unrecognizable payload yields
//! `Processing` with no URLs.

mod carrier;
pub mod paths;
mod scan;
pub mod status;

use serde_json::Value;

use crate::task_result::{MediaKind, TaskStatus};

pub use scan::{scan_urls, MAX_SCAN_DEPTH};

/// Output of [`normalize`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Normalized {
    pub status: TaskStatus,
    pub result_urls: Vec<String>,
    /// Only set when `status` is `Failed`.
    pub error: Option<String>,
    /// `true` when the payload carried an explicit status or at least one URL.
    pub recognized: bool,
}

impl Normalized {
    /// Terminal and usable: a success with URLs, or an explicit failure.
    pub fn is_ready(&self) -> bool {
        match self.status {
            TaskStatus::Success => !self.result_urls.is_empty(),
            TaskStatus::Failed => true,
            TaskStatus::Processing => false,
        }
    }
}

/// Extract status, result URLs and error from an arbitrary provider payload.
pub fn normalize(payload: &Value, kind: MediaKind) -> Normalized {
    let mut result_urls = carrier::direct_urls(payload, 0);
    if result_urls.is_empty() {
        result_urls = scan::fallback_urls(payload, kind);
    }

    let explicit = status::find_status(payload);
    let status = explicit.unwrap_or(if result_urls.is_empty() {
        TaskStatus::Processing
    } else {
        TaskStatus::Success
    });

    let error = match status {
        TaskStatus::Failed => paths::first_string(payload, paths::ERROR_PATHS),
        _ => None,
    };

    Normalized {
        status,
        recognized: explicit.is_some() || !result_urls.is_empty(),
        result_urls,
        error,
    }
}

/// `true` for strings starting with `http://` or `https://`.
pub fn is_http_url(candidate: &str) -> bool {
    candidate.starts_with("http://") || candidate.starts_with("https://")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_object_is_processing() {
        let n = normalize(&json!({}), MediaKind::Any);
        assert_eq!(n.status, TaskStatus::Processing);
        assert!(n.result_urls.is_empty());
        assert_eq!(n.error, None);
        assert!(!n.recognized);
    }

    #[test]
    fn non_object_payloads_never_panic() {
        for payload in [json!(null), json!(3), json!("text"), json!([1, 2])] {
            let n = normalize(&payload, MediaKind::Video);
            assert_eq!(n.status, TaskStatus::Processing);
        }
    }

    #[test]
    fn flat_success_callback() {
        let payload = json!({"taskId": "abc", "status": "SUCCESS", "resultUrls": ["https://x/a.mp4"]});
        let n = normalize(&payload, MediaKind::Video);
        assert_eq!(n.status, TaskStatus::Success);
        assert_eq!(n.result_urls, vec!["https://x/a.mp4"]);
        assert!(n.recognized);
    }

    #[test]
    fn embedded_response_string() {
        let payload = json!({
            "taskId": "t-2",
            "data": {"response": "{\"resultUrls\":[\"https://x/b.png\"]}"}
        });
        let n = normalize(&payload, MediaKind::Image);
        assert_eq!(n.result_urls, vec!["https://x/b.png"]);
        assert_eq!(n.status, TaskStatus::Success);
    }

    #[test]
    fn url_filtering_via_fallback_scan() {
        let payload = json!({"misc": ["foo", "ftp://bar", "http://good.example/x.mp4"]});
        let n = normalize(&payload, MediaKind::Any);
        assert_eq!(n.result_urls, vec!["http://good.example/x.mp4"]);
    }

    #[test]
    fn fallback_only_when_direct_lookup_empty() {
        let payload = json!({
            "resultUrls": ["https://x/direct.png"],
            "extra": {"link": "https://x/other.png"}
        });
        let n = normalize(&payload, MediaKind::Any);
        assert_eq!(n.result_urls, vec!["https://x/direct.png"]);
    }

    #[test]
    fn url_without_status_defaults_to_success() {
        let payload = json!({"somewhere": {"odd": "https://x/v.mp4"}});
        let n = normalize(&payload, MediaKind::Video);
        assert_eq!(n.status, TaskStatus::Success);
    }

    #[test]
    fn failure_with_reason() {
        let payload = json!({"data": {"taskId": "t", "successFlag": 3, "failMsg": "content policy"}});
        let n = normalize(&payload, MediaKind::Image);
        assert_eq!(n.status, TaskStatus::Failed);
        assert_eq!(n.error.as_deref(), Some("content policy"));
        assert!(n.is_ready());
    }

    #[test]
    fn error_ignored_for_non_failed_status() {
        let payload = json!({"status": "processing", "error": "transient"});
        let n = normalize(&payload, MediaKind::Video);
        assert_eq!(n.status, TaskStatus::Processing);
        assert_eq!(n.error, None);
        assert!(n.recognized);
    }

    #[test]
    fn kie_record_info_shape() {
        let payload = json!({
            "code": 200,
            "msg": "success",
            "data": {
                "taskId": "k-1",
                "state": "success",
                "resultJson": "{\"resultUrls\":[\"https://cdn.example/out.mp4\"]}",
                "failMsg": ""
            }
        });
        let n = normalize(&payload, MediaKind::Video);
        assert_eq!(n.status, TaskStatus::Success);
        assert_eq!(n.result_urls, vec!["https://cdn.example/out.mp4"]);
        assert_eq!(n.error, None);
    }
}
