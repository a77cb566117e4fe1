use async_trait::async_trait;
use serde_json::Value;

use dancegen_core::normalize::Normalized;
use dancegen_core::task_result::MediaKind;

use crate::api::{KieApi, KieApiError};
use crate::history::HistoryRecord;

/// A status-query response that carried recognizable task data.
#[derive(Debug, Clone)]
pub struct ProviderReport {
    /// `METHOD url` of the candidate that answered.
    pub endpoint: String,
    pub payload: Value,
    pub normalized: Normalized,
}

/// Outbound operations the reconciler needs from the generation provider.
#[async_trait]
pub trait TaskProvider: Send + Sync {
    /// Query task status, trying every candidate endpoint and method in
    /// order. Fails with the last error once all candidates are exhausted.
    async fn query_task(&self, task_id: &str, kind: MediaKind)
        -> Result<ProviderReport, KieApiError>;

    /// Fetch one page (1-based) of the account's record history.
    async fn history_page(&self, page: u32) -> Result<Vec<HistoryRecord>, KieApiError>;

    /// `HEAD` a URL; `true` when it answers with a 2xx status.
    async fn probe_url(&self, url: &str) -> Result<bool, KieApiError>;
}

#[async_trait]
impl TaskProvider for KieApi {
    async fn query_task(
        &self,
        task_id: &str,
        kind: MediaKind,
    ) -> Result<ProviderReport, KieApiError> {
        KieApi::query_task(self, task_id, kind).await
    }

    async fn history_page(&self, page: u32) -> Result<Vec<HistoryRecord>, KieApiError> {
        KieApi::history_page(self, page).await
    }

    async fn probe_url(&self, url: &str) -> Result<bool, KieApiError> {
        KieApi::probe_url(self, url).await
    }
}
