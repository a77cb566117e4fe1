//! Diagnostics over the result cache.

use axum::extract::State;
use axum::Json;
use chrono::Utc;

use dancegen_core::store::StoreStats;

use crate::error::AppResult;
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /api/v1/tasks/cache/stats
///
/// Count and keys of live entries.
pub async fn cache_stats(State(state): State<AppState>) -> AppResult<Json<DataResponse<StoreStats>>> {
    let stats = state.store.stats(Utc::now()).await?;
    Ok(Json(DataResponse { data: stats }))
}
