//! Route definitions for the `/tasks` resource.
//!
//! Unauthenticated: the provider calls the webhook directly.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::{cache, callback, status};
use crate::state::AppState;

/// Routes mounted at `/tasks`.
///
/// ```text
/// POST   /callback        -> receive_callback
/// GET    /status          -> poll_status
/// GET    /cache/stats     -> cache_stats
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/callback", post(callback::receive_callback))
        .route("/status", get(status::poll_status))
        .route("/cache/stats", get(cache::cache_stats))
}
