//! Status inference from labels and numeric success flags.

use serde_json::Value;

use super::paths::{lookup, FieldPath, STATUS_LABEL_PATHS, SUCCESS_FLAG_PATHS};
use crate::task_result::TaskStatus;

/// A raw status indicator found in a payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusSignal<'a> {
    /// Free-form label such as `"SUCCESS"` or `"generate_failed"`.
    Label(&'a str),
    /// Numeric success flag.
    Flag(i64),
}

impl<'a> StatusSignal<'a> {
    fn from_value(value: &'a Value) -> Option<Self> {
        match value {
            Value::String(s) => match s.trim().parse::<i64>() {
                Ok(flag) => Some(Self::Flag(flag)),
                Err(_) => Some(Self::Label(s.trim())),
            },
            Value::Number(n) => n.as_i64().map(Self::Flag),
            _ => None,
        }
    }

    /// Map onto a [`TaskStatus`], or `None` for unknown values.
    pub fn resolve(self) -> Option<TaskStatus> {
        match self {
            Self::Flag(flag) => status_from_flag(flag),
            Self::Label(label) => status_from_label(label),
        }
    }
}

/// `0` running, `1` done, `2` or `3` failed.
pub fn status_from_flag(flag: i64) -> Option<TaskStatus> {
    match flag {
        0 => Some(TaskStatus::Processing),
        1 => Some(TaskStatus::Success),
        2 | 3 => Some(TaskStatus::Failed),
        _ => None,
    }
}

/// Case-insensitive match against the provider's status vocabulary.
pub fn status_from_label(label: &str) -> Option<TaskStatus> {
    match label.to_ascii_lowercase().as_str() {
        "success" | "completed" => Some(TaskStatus::Success),
        "processing" | "pending" | "waiting" | "queuing" | "generating" => {
            Some(TaskStatus::Processing)
        }
        "failed" | "fail" | "error" | "generate_failed" | "create_task_failed" => {
            Some(TaskStatus::Failed)
        }
        _ => None,
    }
}

/// First recognized status: labels are consulted before success flags.
/// Unknown values are skipped rather than ending the search.
pub(crate) fn find_status(payload: &Value) -> Option<TaskStatus> {
    first_resolved(payload, STATUS_LABEL_PATHS)
        .or_else(|| first_resolved(payload, SUCCESS_FLAG_PATHS))
}

fn first_resolved(payload: &Value, paths: &[FieldPath]) -> Option<TaskStatus> {
    paths
        .iter()
        .filter_map(|path| lookup(payload, path))
        .filter_map(StatusSignal::from_value)
        .find_map(StatusSignal::resolve)
}
