//! Query parameter types for the task endpoints.

use serde::Deserialize;

use dancegen_core::error::CoreError;
use dancegen_core::task_result::MediaKind;

/// `?taskId=&kind=` on the status endpoint.
#[derive(Debug, Deserialize)]
pub struct PollParams {
    #[serde(rename = "taskId", alias = "task_id")]
    pub task_id: Option<String>,
    pub kind: Option<String>,
}

impl PollParams {
    /// The task ID with surrounding whitespace removed, if non-blank.
    pub fn task_id(&self) -> Option<&str> {
        self.task_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
    }

    /// The requested media kind, `video` when absent or blank.
    pub fn kind(&self) -> Result<MediaKind, CoreError> {
        parse_kind(self.kind.as_deref(), MediaKind::Video)
    }
}

/// `?kind=` on the callback endpoint.
#[derive(Debug, Default, Deserialize)]
pub struct CallbackParams {
    pub kind: Option<String>,
}

impl CallbackParams {
    /// The hinted media kind, `any` when absent or blank.
    pub fn kind(&self) -> Result<MediaKind, CoreError> {
        parse_kind(self.kind.as_deref(), MediaKind::Any)
    }
}

fn parse_kind(raw: Option<&str>, default: MediaKind) -> Result<MediaKind, CoreError> {
    match raw.map(str::trim).filter(|raw| !raw.is_empty()) {
        Some(raw) => raw.parse(),
        None => Ok(default),
    }
}
