pub mod health;
pub mod tasks;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /tasks/callback                 provider webhook (POST)
/// /tasks/status                   poll task status (GET)
/// /tasks/cache/stats              live cache entries (GET)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new().nest("/tasks", tasks::router())
}
