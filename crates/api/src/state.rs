use std::sync::Arc;

use dancegen_core::store::ResultStore;

use crate::reconcile::Reconciler;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc`).
#[derive(Clone)]
pub struct AppState {
    /// Result cache written by callbacks and read by polls.
    pub store: Arc<dyn ResultStore>,
    /// Poll-time reconciliation against the provider. Shares `store`.
    pub reconciler: Arc<Reconciler>,
}
