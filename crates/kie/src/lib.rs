//! REST client for the Kie.ai generation provider.
//!
//! Wraps the provider's task-status endpoints (several historical path
//! variants), the paginated record history and plain `HEAD` probes behind
//! the [`provider::TaskProvider`] trait so the reconciler can be tested
//! against a fake.

pub mod api;
pub mod config;
pub mod endpoints;
pub mod history;
pub mod provider;

pub use api::{KieApi, KieApiError};
pub use config::KieConfig;
pub use provider::{ProviderReport, TaskProvider};
