//! Task-result bridge API server library.
//!
//! Exposes the building blocks (config, state, error handling, routes, the
//! reconciler) so integration tests and the binary entrypoint share them.

pub mod background;
pub mod config;
pub mod error;
pub mod handlers;
pub mod query;
pub mod reconcile;
pub mod response;
pub mod router;
pub mod routes;
pub mod state;
