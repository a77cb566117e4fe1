//! Provider endpoint paths.
//!
//! The status endpoint has moved between product lines over time, so the
//! client tries every known variant in order.

use std::fmt;

use dancegen_core::task_result::MediaKind;

pub const VIDEO_STATUS_PATHS: &[&str] = &[
    "/api/v1/veo/record-info",
    "/api/v1/jobs/recordInfo",
    "/api/v1/runway/record-detail",
];

pub const IMAGE_STATUS_PATHS: &[&str] = &[
    "/api/v1/gpt4o-image/record-info",
    "/api/v1/flux/kontext/record-info",
    "/api/v1/jobs/recordInfo",
];

pub const ANY_STATUS_PATHS: &[&str] = &[
    "/api/v1/jobs/recordInfo",
    "/api/v1/veo/record-info",
    "/api/v1/gpt4o-image/record-info",
    "/api/v1/flux/kontext/record-info",
    "/api/v1/runway/record-detail",
];

/// Paginated "user record history" listing.
pub const HISTORY_PATH: &str = "/api/v1/user/record/list";

/// Status endpoint candidates for a media kind, in the order to try them.
pub fn status_paths(kind: MediaKind) -> &'static [&'static str] {
    match kind {
        MediaKind::Video => VIDEO_STATUS_PATHS,
        MediaKind::Image => IMAGE_STATUS_PATHS,
        MediaKind::Any => ANY_STATUS_PATHS,
    }
}

/// Most status requests a single [`crate::KieApi::query_task`] call can make.
pub fn max_status_candidates() -> usize {
    [MediaKind::Video, MediaKind::Image, MediaKind::Any]
        .into_iter()
        .map(|kind| status_paths(kind).len())
        .max()
        .unwrap_or(0)
        * QueryMethod::ALL.len()
}

/// How the task ID is sent to a status endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryMethod {
    /// `GET <path>?taskId=<id>`
    Get,
    /// `POST <path>` with `{"taskId": "<id>"}`
    Post,
}

impl QueryMethod {
    pub const ALL: [QueryMethod; 2] = [QueryMethod::Get, QueryMethod::Post];
}

impl fmt::Display for QueryMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Get => f.write_str("GET"),
            Self::Post => f.write_str("POST"),
        }
    }
}
