//! HTTP client for the provider's REST endpoints.
//!
//! Every provider response is wrapped in a `{"code", "msg", "data"}`
//! envelope whose `code` can signal failure even on HTTP 200, so both the
//! transport status and the envelope code are checked.

use std::time::Duration;

use serde_json::{json, Value};

use dancegen_core::normalize::normalize;
use dancegen_core::task_result::MediaKind;

use crate::config::KieConfig;
use crate::endpoints::{self, QueryMethod};
use crate::history::{self, HistoryRecord};
use crate::provider::ProviderReport;

/// HTTP client for one provider account.
pub struct KieApi {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    history_page_size: u32,
}

/// Errors from the provider REST layer.
#[derive(Debug, thiserror::Error)]
pub enum KieApiError {
    /// The HTTP request itself failed (network, DNS, TLS, timeout, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Non-2xx HTTP status, or a non-200 envelope `code`.
    #[error("Kie API error ({status}): {body}")]
    ApiError {
        /// HTTP status or envelope code.
        status: u16,
        /// Raw body or envelope message for debugging.
        body: String,
    },

    /// The response body was not valid JSON.
    #[error("Invalid JSON from {endpoint}: {source}")]
    Decode {
        endpoint: String,
        #[source]
        source: serde_json::Error,
    },

    /// Valid JSON without any status or result the normalizer recognizes.
    #[error("No recognizable task data from {endpoint}")]
    Unrecognized { endpoint: String },

    /// There was no candidate endpoint to try.
    #[error("No status endpoint candidates configured")]
    NoCandidates,
}

impl KieApi {
    /// Build a client from configuration.
    pub fn new(config: &KieConfig) -> Result<Self, KieApiError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;
        Ok(Self::with_client(client, config))
    }

    /// Build a client reusing an existing [`reqwest::Client`].
    pub fn with_client(client: reqwest::Client, config: &KieConfig) -> Self {
        Self {
            client,
            base_url: config.base_url.clone(),
            api_key: config.api_key.clone(),
            history_page_size: config.history_page_size,
        }
    }

    /// Query task status across every candidate endpoint and method.
    ///
    /// Candidates are tried sequentially; the first one answering with a
    /// 2xx, a successful envelope and a payload the normalizer recognizes
    /// wins. Failures are logged and the next candidate is tried.
    pub async fn query_task(
        &self,
        task_id: &str,
        kind: MediaKind,
    ) -> Result<ProviderReport, KieApiError> {
        let mut last_err: Option<KieApiError> = None;

        for path in endpoints::status_paths(kind) {
            let url = format!("{}{}", self.base_url, path);
            for method in QueryMethod::ALL {
                match self.query_candidate(&url, method, task_id, kind).await {
                    Ok(report) => {
                        tracing::debug!(task_id, endpoint = %report.endpoint, "Status query answered");
                        return Ok(report);
                    }
                    Err(e) => {
                        tracing::debug!(
                            task_id,
                            %method,
                            url = %url,
                            error = %e,
                            "Status query candidate failed, trying next",
                        );
                        last_err = Some(e);
                    }
                }
            }
        }

        Err(last_err.unwrap_or(KieApiError::NoCandidates))
    }

    /// Fetch one page (1-based) of the record history.
    pub async fn history_page(&self, page: u32) -> Result<Vec<HistoryRecord>, KieApiError> {
        let url = format!("{}{}", self.base_url, endpoints::HISTORY_PATH);
        let request = self.client.get(&url).query(&[
            ("pageNum", page.to_string()),
            ("pageSize", self.history_page_size.to_string()),
        ]);

        let payload = self.send_json(request, &url).await?;
        Ok(history::parse_records(&payload))
    }

    /// `HEAD` a media URL. Storage hosts are public, so no auth is sent.
    pub async fn probe_url(&self, url: &str) -> Result<bool, KieApiError> {
        let response = self.client.head(url).send().await?;
        Ok(response.status().is_success())
    }

    // ---- private helpers ----

    async fn query_candidate(
        &self,
        url: &str,
        method: QueryMethod,
        task_id: &str,
        kind: MediaKind,
    ) -> Result<ProviderReport, KieApiError> {
        let request = match method {
            QueryMethod::Get => self.client.get(url).query(&[("taskId", task_id)]),
            QueryMethod::Post => self.client.post(url).json(&json!({ "taskId": task_id })),
        };
        let endpoint = format!("{method} {url}");

        let payload = self.send_json(request, &endpoint).await?;
        let normalized = normalize(&payload, kind);
        if !normalized.recognized {
            return Err(KieApiError::Unrecognized { endpoint });
        }

        Ok(ProviderReport {
            endpoint,
            payload,
            normalized,
        })
    }

    /// Send an authorized request and decode a successful JSON envelope.
    async fn send_json(
        &self,
        request: reqwest::RequestBuilder,
        endpoint: &str,
    ) -> Result<Value, KieApiError> {
        let request = match &self.api_key {
            Some(key) => request.bearer_auth(key),
            None => request,
        };

        let response = Self::ensure_success(request.send().await?).await?;
        let text = response.text().await?;
        let payload: Value = serde_json::from_str(&text).map_err(|source| KieApiError::Decode {
            endpoint: endpoint.to_string(),
            source,
        })?;

        check_envelope(&payload)?;
        Ok(payload)
    }

    /// Ensure the response has a success status code. Returns the
    /// response unchanged on success, or a [`KieApiError::ApiError`]
    /// containing the status and body text on failure.
    async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, KieApiError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(KieApiError::ApiError {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }
}

/// Reject envelopes whose numeric `code` is present and not 200.
fn check_envelope(payload: &Value) -> Result<(), KieApiError> {
    match payload.get("code").and_then(Value::as_i64) {
        Some(code) if code != 200 => Err(KieApiError::ApiError {
            status: u16::try_from(code).unwrap_or(u16::MAX),
            body: payload
                .get("msg")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
        }),
        _ => Ok(()),
    }
}
