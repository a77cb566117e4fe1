//! Frontend polling.

use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::Json;

use crate::error::{AppError, AppResult};
use crate::query::PollParams;
use crate::reconcile::Resolution;
use crate::state::AppState;

/// GET /api/v1/tasks/status?taskId=&kind=
///
/// Answer from the cache when possible, otherwise reconcile against the
/// provider. Unknown tasks report `PROCESSING`.
pub async fn poll_status(
    State(state): State<AppState>,
    params: Result<Query<PollParams>, QueryRejection>,
) -> AppResult<Json<Resolution>> {
    let Query(params) = params.map_err(|e| AppError::BadRequest(e.body_text()))?;

    let task_id = params
        .task_id()
        .ok_or_else(|| AppError::BadRequest("taskId is required".into()))?;
    let kind = params.kind()?;

    let resolution = state.reconciler.resolve(task_id, kind).await?;
    Ok(Json(resolution))
}
