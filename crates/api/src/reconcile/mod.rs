//! Resolution of a polled task ID across every available source.
//!
//! Order, short-circuiting on the first usable answer:
//!
//! 1. the result cache (a success with URLs, or a failure),
//! 2. a direct provider status query over all candidate endpoints,
//! 3. the provider's record history (image tasks only),
//! 4. guessed storage URLs for stuck tasks (opt-in).
//!
//! Steps 2 to 4 run under a [`SingleFlight`] guard so concurrent polls for
//! the same task share one set of outbound calls, and under a deadline
//! ([`ReconcileConfig::resolve_timeout_secs`]) that ends before the HTTP
//! request timeout.

mod singleflight;

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;

use dancegen_core::normalize::normalize;
use dancegen_core::recovery::{guess_urls, is_stuck};
use dancegen_core::store::{PutOutcome, ResultStore};
use dancegen_core::task_result::{MediaKind, TaskResult, TaskStatus};
use dancegen_kie::history::HistoryRecord;
use dancegen_kie::TaskProvider;

use crate::config::ReconcileConfig;

pub use singleflight::SingleFlight;

/// Where a [`Resolution`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionSource {
    Cache,
    Provider,
    History,
    UrlGuess,
    /// No source knew anything about the task yet.
    Pending,
}

/// Body of a successful poll response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Resolution {
    pub status: TaskStatus,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub result_urls: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub source: ResolutionSource,
}

impl Resolution {
    fn from_result(result: &TaskResult, source: ResolutionSource) -> Self {
        Self {
            status: result.status,
            result_urls: result.result_urls.clone(),
            error: result.error.clone(),
            source,
        }
    }

    fn pending() -> Self {
        Self {
            status: TaskStatus::Processing,
            result_urls: Vec::new(),
            error: None,
            source: ResolutionSource::Pending,
        }
    }
}

/// Failure of a whole resolution. `Clone` so shared resolutions can hand a
/// copy to every waiter.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReconcileError {
    /// The provider query failed on every candidate and no other source had
    /// seen the task. Carries the last provider error.
    #[error("{0}")]
    ProviderUnavailable(String),
    /// The shared resolution task panicked or was cancelled.
    #[error("resolution aborted")]
    Aborted,
}

type InFlightKey = (MediaKind, String);

/// Ties the result store and the provider together for polling.
pub struct Reconciler {
    store: Arc<dyn ResultStore>,
    provider: Arc<dyn TaskProvider>,
    config: ReconcileConfig,
    in_flight: SingleFlight<InFlightKey, Result<Resolution, ReconcileError>>,
}

impl Reconciler {
    pub fn new(
        store: Arc<dyn ResultStore>,
        provider: Arc<dyn TaskProvider>,
        config: ReconcileConfig,
    ) -> Self {
        Self {
            store,
            provider,
            config,
            in_flight: SingleFlight::new(),
        }
    }

    /// Resolve the current state of `task_id`.
    ///
    /// Only the local store is mutated; provider calls are read-only.
    pub async fn resolve(
        self: &Arc<Self>,
        task_id: &str,
        kind: MediaKind,
    ) -> Result<Resolution, ReconcileError> {
        let cached = self.cached(task_id).await;
        if let Some(entry) = cached.as_ref().filter(|entry| entry.is_ready()) {
            tracing::debug!(task_id, status = %entry.status, "Served from cache");
            return Ok(Resolution::from_result(entry, ResolutionSource::Cache));
        }

        let this = Arc::clone(self);
        let owned_id = task_id.to_string();
        let deadline = self.config.resolve_timeout();
        self.in_flight
            .run((kind, task_id.to_string()), async move {
                let fallback = cached.clone();
                match tokio::time::timeout(deadline, this.resolve_uncached(&owned_id, kind, cached))
                    .await
                {
                    Ok(resolved) => resolved,
                    Err(_) => {
                        tracing::warn!(
                            task_id = %owned_id,
                            %kind,
                            deadline_secs = deadline.as_secs(),
                            "Resolution deadline elapsed",
                        );
                        match fallback {
                            Some(entry) => Ok(Resolution::from_result(&entry, ResolutionSource::Cache)),
                            None => Err(ReconcileError::ProviderUnavailable(format!(
                                "provider timed out after {}s",
                                deadline.as_secs()
                            ))),
                        }
                    }
                }
            })
            .await
            .unwrap_or_else(|| {
                tracing::error!(task_id, %kind, "Resolution task aborted");
                Err(ReconcileError::Aborted)
            })
    }

    async fn resolve_uncached(
        &self,
        task_id: &str,
        kind: MediaKind,
        cached: Option<TaskResult>,
    ) -> Result<Resolution, ReconcileError> {
        // Best non-final evidence seen so far, reported if nothing better turns up.
        let mut known = cached.map(|entry| (entry, ResolutionSource::Cache));
        let mut provider_error: Option<String> = None;

        // --- Direct status query ---
        match self.provider.query_task(task_id, kind).await {
            Ok(report) => {
                let result = TaskResult::from_normalized(task_id, report.normalized);
                tracing::info!(
                    task_id,
                    endpoint = %report.endpoint,
                    status = %result.status,
                    urls = result.result_urls.len(),
                    "Provider status query answered",
                );
                self.remember(&result).await;
                if result.is_ready() {
                    return Ok(Resolution::from_result(&result, ResolutionSource::Provider));
                }
                known = Some((result, ResolutionSource::Provider));
            }
            Err(e) => {
                tracing::warn!(task_id, %kind, error = %e, "Provider status query exhausted");
                provider_error = Some(e.to_string());
            }
        }

        // --- History scan ---
        if kind == MediaKind::Image && self.config.history_scan_enabled {
            if let Some(record) = self.find_in_history(task_id).await {
                let normalized = normalize(&record.payload, kind);
                let result = TaskResult::from_normalized(task_id, normalized);

                if result.is_ready() {
                    tracing::info!(task_id, status = %result.status, "Resolved from history");
                    self.remember(&result).await;
                    return Ok(Resolution::from_result(&result, ResolutionSource::History));
                }

                if let Some(recovered) = self.recover_stuck(&record, result.status).await {
                    self.remember(&recovered).await;
                    return Ok(Resolution::from_result(&recovered, ResolutionSource::UrlGuess));
                }

                if known.is_none() {
                    known = Some((result, ResolutionSource::History));
                }
            }
        }

        match (known, provider_error) {
            (Some((result, source)), _) => Ok(Resolution::from_result(&result, source)),
            (None, Some(error)) => Err(ReconcileError::ProviderUnavailable(error)),
            (None, None) => Ok(Resolution::pending()),
        }
    }

    /// Live cache entry, treating store failures as a miss.
    async fn cached(&self, task_id: &str) -> Option<TaskResult> {
        match self.store.get(task_id, Utc::now()).await {
            Ok(entry) => entry,
            Err(e) => {
                tracing::error!(task_id, error = %e, "Result store read failed");
                None
            }
        }
    }

    async fn remember(&self, result: &TaskResult) {
        match self.store.put(result.clone()).await {
            Ok(PutOutcome::Stored) => {}
            Ok(PutOutcome::IgnoredRegression) => {
                tracing::debug!(
                    task_id = %result.task_id,
                    "Kept terminal cache entry over non-terminal provider state",
                );
            }
            Err(e) => {
                tracing::error!(task_id = %result.task_id, error = %e, "Result store write failed");
            }
        }
    }

    /// Walk history pages until the task shows up, a page comes back
    /// empty, or the page limit is reached.
    async fn find_in_history(&self, task_id: &str) -> Option<HistoryRecord> {
        for page in 1..=self.config.history_max_pages {
            let records = match self.provider.history_page(page).await {
                Ok(records) => records,
                Err(e) => {
                    tracing::warn!(task_id, page, error = %e, "History page fetch failed");
                    return None;
                }
            };

            if records.is_empty() {
                tracing::debug!(task_id, page, "History exhausted");
                return None;
            }

            if let Some(record) = records.into_iter().find(|r| r.task_id == task_id) {
                tracing::debug!(task_id, page, "Found task in history");
                return Some(record);
            }
        }
        None
    }

    /// Probe guessed storage URLs for a task stuck in a non-terminal state.
    async fn recover_stuck(&self, record: &HistoryRecord, status: TaskStatus) -> Option<TaskResult> {
        if !self.config.url_guess_enabled {
            return None;
        }
        let created_at = record.created_at?;
        if !is_stuck(status, created_at, Utc::now(), self.config.stuck_threshold()) {
            return None;
        }

        let candidates = guess_urls(
            &self.config.url_guess_template,
            &record.task_id,
            created_at,
            &self.config.url_guess_candidates,
            self.config.url_guess_max_attempts,
        );
        tracing::info!(
            task_id = %record.task_id,
            attempts = candidates.len(),
            "Task looks stuck, probing guessed URLs",
        );

        for url in candidates {
            match self.provider.probe_url(&url).await {
                Ok(true) => {
                    tracing::info!(task_id = %record.task_id, %url, "Guessed URL exists");
                    return Some(TaskResult::new(
                        record.task_id.clone(),
                        TaskStatus::Success,
                        vec![url],
                        None,
                    ));
                }
                Ok(false) => {}
                Err(e) => {
                    tracing::debug!(task_id = %record.task_id, %url, error = %e, "Probe failed");
                }
            }
        }
        None
    }
}
