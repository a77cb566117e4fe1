//! Task result types shared by the store, the normalizer and the HTTP layer.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::normalize::{is_http_url, Normalized};
use crate::types::{TaskId, Timestamp};

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// Normalized lifecycle state of a provider task.
///
/// `Success` and `Failed` are terminal. See [`TaskStatus::accepts`] for the
/// transition rule applied by result stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    Processing,
    Success,
    Failed,
}

impl TaskStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Success | Self::Failed)
    }

    /// Whether a write carrying `next` may replace an entry in this state.
    ///
    /// Terminal states never move back to `Processing`; every other
    /// transition (including terminal to terminal) is last-write-wins.
    pub fn accepts(self, next: TaskStatus) -> bool {
        !(self.is_terminal() && next == Self::Processing)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Processing => "PROCESSING",
            Self::Success => "SUCCESS",
            Self::Failed => "FAILED",
        }
    }

    /// Parse the stored (upper-case) representation.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "PROCESSING" => Some(Self::Processing),
            "SUCCESS" => Some(Self::Success),
            "FAILED" => Some(Self::Failed),
            _ => None,
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Media kind
// ---------------------------------------------------------------------------

/// Which kind of media a caller expects a task to produce.
///
/// Drives the URL preference of the deep-scan fallback and which provider
/// endpoints are queried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    #[default]
    Video,
    Image,
    Any,
}

impl MediaKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Video => "video",
            Self::Image => "image",
            Self::Any => "any",
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Case-insensitive, surrounding whitespace ignored.
impl FromStr for MediaKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "video" => Ok(Self::Video),
            "image" => Ok(Self::Image),
            "any" => Ok(Self::Any),
            other => Err(CoreError::Validation(format!(
                "unknown kind '{other}', expected video, image or any"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// TaskResult
// ---------------------------------------------------------------------------

/// Last known result for one provider task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskResult {
    pub task_id: TaskId,
    pub status: TaskStatus,
    pub result_urls: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub recorded_at: Timestamp,
}

impl TaskResult {
    /// Build a result stamped with the current time.
    pub fn new(
        task_id: impl Into<TaskId>,
        status: TaskStatus,
        result_urls: Vec<String>,
        error: Option<String>,
    ) -> Self {
        Self::with_timestamp(task_id, status, result_urls, error, chrono::Utc::now())
    }

    /// Build a result with an explicit `recorded_at`.
    ///
    /// Non-http(s) and duplicate URLs are dropped, and `error` is only kept
    /// for `Failed` results.
    pub fn with_timestamp(
        task_id: impl Into<TaskId>,
        status: TaskStatus,
        result_urls: Vec<String>,
        error: Option<String>,
        recorded_at: Timestamp,
    ) -> Self {
        let mut urls: Vec<String> = Vec::with_capacity(result_urls.len());
        for url in result_urls {
            if is_http_url(&url) && !urls.contains(&url) {
                urls.push(url);
            }
        }

        Self {
            task_id: task_id.into(),
            status,
            result_urls: urls,
            error: if status == TaskStatus::Failed { error } else { None },
            recorded_at,
        }
    }

    /// Build a result from normalizer output, stamped with the current time.
    pub fn from_normalized(task_id: impl Into<TaskId>, normalized: Normalized) -> Self {
        Self::new(
            task_id,
            normalized.status,
            normalized.result_urls,
            normalized.error,
        )
    }

    /// A result the poller can hand back without asking the provider again:
    /// a success with at least one URL, or an explicit failure.
    pub fn is_ready(&self) -> bool {
        match self.status {
            TaskStatus::Success => !self.result_urls.is_empty(),
            TaskStatus::Failed => true,
            TaskStatus::Processing => false,
        }
    }

    /// Whether this entry is older than `ttl` at `now`.
    pub fn is_expired(&self, now: Timestamp, ttl: chrono::Duration) -> bool {
        now - self.recorded_at > ttl
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
