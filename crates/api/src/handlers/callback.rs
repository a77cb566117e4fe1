//! Provider webhook ingestion.
//!
//! The provider retries on anything but a 2xx, and a retry cannot fix a
//! payload we fail to understand, so every request is acknowledged with
//! `200`. Problems are reported in the `warning` field and the log.

use axum::body::Bytes;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::Json;
use serde::Serialize;
use serde_json::Value;

use dancegen_core::normalize::normalize;
use dancegen_core::store::PutOutcome;
use dancegen_core::task_id::extract_task_id;
use dancegen_core::task_result::{MediaKind, TaskResult, TaskStatus};

use crate::query::CallbackParams;
use crate::state::AppState;

/// Acknowledgement returned to the provider.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CallbackAck {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_status: Option<TaskStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stored: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

impl CallbackAck {
    fn warning(message: impl Into<String>) -> Self {
        Self {
            status: "received",
            task_id: None,
            task_status: None,
            stored: None,
            warning: Some(message.into()),
        }
    }
}

/// POST /api/v1/tasks/callback
///
/// Normalize the webhook body and write exactly one cache entry for it.
pub async fn receive_callback(
    State(state): State<AppState>,
    params: Result<Query<CallbackParams>, QueryRejection>,
    body: Bytes,
) -> Json<CallbackAck> {
    let kind = match params.map(|Query(params)| params.kind()) {
        Ok(Ok(kind)) => kind,
        Ok(Err(e)) => {
            tracing::warn!(error = %e, "Ignoring invalid callback kind");
            MediaKind::Any
        }
        Err(e) => {
            tracing::warn!(error = %e, "Ignoring invalid callback query string");
            MediaKind::Any
        }
    };

    let payload: Value = match serde_json::from_slice(&body) {
        Ok(payload) => payload,
        Err(e) => {
            tracing::warn!(error = %e, bytes = body.len(), "Callback body is not valid JSON");
            return Json(CallbackAck::warning(format!("invalid JSON body: {e}")));
        }
    };

    let Some(task_id) = extract_task_id(&payload) else {
        tracing::warn!("Callback without a task id");
        return Json(CallbackAck::warning("missing task id"));
    };

    let normalized = normalize(&payload, kind);
    if normalized.result_urls.is_empty() {
        tracing::warn!(task_id = %task_id, status = %normalized.status, "Callback carried no result URLs");
    }

    let result = TaskResult::from_normalized(task_id.clone(), normalized);
    let task_status = result.status;
    let url_count = result.result_urls.len();

    let stored = match state.store.put(result).await {
        Ok(PutOutcome::Stored) => true,
        Ok(PutOutcome::IgnoredRegression) => {
            tracing::info!(task_id = %task_id, "Callback would regress a terminal result, ignored");
            false
        }
        Err(e) => {
            tracing::error!(task_id = %task_id, error = %e, "Failed to store callback result");
            false
        }
    };

    tracing::info!(
        task_id = %task_id,
        status = %task_status,
        urls = url_count,
        stored,
        "Callback received",
    );

    Json(CallbackAck {
        status: "received",
        task_id: Some(task_id),
        task_status: Some(task_status),
        stored: Some(stored),
        warning: None,
    })
}
