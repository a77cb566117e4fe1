use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use dancegen_api::config::{CacheConfig, ReconcileConfig, ServerConfig};
use dancegen_api::reconcile::Reconciler;
use dancegen_api::router::build_app_router;
use dancegen_api::state::AppState;
use dancegen_core::normalize::normalize;
use dancegen_core::store::{MemoryResultStore, ResultStore};
use dancegen_core::task_result::MediaKind;
use dancegen_kie::history::HistoryRecord;
use dancegen_kie::{KieApiError, ProviderReport, TaskProvider};

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 30,
        database_url: None,
        cache: CacheConfig::default(),
        reconcile: ReconcileConfig::default(),
    }
}

// ---------------------------------------------------------------------------
// Fake provider
// ---------------------------------------------------------------------------

/// In-process [`TaskProvider`] with canned answers and call counters.
#[derive(Default)]
pub struct FakeProvider {
    tasks: HashMap<String, Value>,
    history: Vec<Vec<HistoryRecord>>,
    live_urls: HashSet<String>,
    query_delay: Option<Duration>,
    pub query_calls: AtomicUsize,
    pub history_calls: AtomicUsize,
    pub probe_calls: AtomicUsize,
}

impl FakeProvider {
    /// Answer status queries for `task_id` with `payload`.
    pub fn with_task(mut self, task_id: &str, payload: Value) -> Self {
        self.tasks.insert(task_id.to_string(), payload);
        self
    }

    /// Append a history page.
    pub fn with_history_page(mut self, records: Vec<HistoryRecord>) -> Self {
        self.history.push(records);
        self
    }

    /// Make `url` answer probes with success.
    pub fn with_live_url(mut self, url: &str) -> Self {
        self.live_urls.insert(url.to_string());
        self
    }

    pub fn with_query_delay(mut self, delay: Duration) -> Self {
        self.query_delay = Some(delay);
        self
    }

    pub fn query_count(&self) -> usize {
        self.query_calls.load(Ordering::SeqCst)
    }

    pub fn history_count(&self) -> usize {
        self.history_calls.load(Ordering::SeqCst)
    }

    pub fn probe_count(&self) -> usize {
        self.probe_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TaskProvider for FakeProvider {
    async fn query_task(
        &self,
        task_id: &str,
        kind: MediaKind,
    ) -> Result<ProviderReport, KieApiError> {
        self.query_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.query_delay {
            tokio::time::sleep(delay).await;
        }

        let Some(payload) = self.tasks.get(task_id) else {
            return Err(KieApiError::ApiError {
                status: 404,
                body: "record not found".into(),
            });
        };

        let endpoint = "GET fake://record-info".to_string();
        let normalized = normalize(payload, kind);
        if !normalized.recognized {
            return Err(KieApiError::Unrecognized { endpoint });
        }
        Ok(ProviderReport {
            endpoint,
            payload: payload.clone(),
            normalized,
        })
    }

    async fn history_page(&self, page: u32) -> Result<Vec<HistoryRecord>, KieApiError> {
        self.history_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .history
            .get(page as usize - 1)
            .cloned()
            .unwrap_or_default())
    }

    async fn probe_url(&self, url: &str) -> Result<bool, KieApiError> {
        self.probe_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.live_urls.contains(url))
    }
}

// ---------------------------------------------------------------------------
// App builders
// ---------------------------------------------------------------------------

/// Everything a test needs to drive and inspect the app.
pub struct TestApp {
    pub router: Router,
    pub store: Arc<dyn ResultStore>,
}

/// Build the full application router over a memory store and `provider`.
///
/// Uses the same [`build_app_router`] as `main.rs` so tests exercise the
/// production middleware stack.
pub fn build_test_app_with(
    provider: Arc<dyn TaskProvider>,
    reconcile: ReconcileConfig,
) -> TestApp {
    let mut config = test_config();
    config.reconcile = reconcile;
    build_test_app_from(provider, config)
}

/// Full control over the server settings, e.g. a short request timeout.
pub fn build_test_app_from(provider: Arc<dyn TaskProvider>, config: ServerConfig) -> TestApp {
    let store: Arc<dyn ResultStore> = Arc::new(MemoryResultStore::new(config.cache.ttl()));
    let reconciler = Arc::new(Reconciler::new(
        Arc::clone(&store),
        provider,
        config.reconcile.clone(),
    ));

    let state = AppState {
        store: Arc::clone(&store),
        reconciler,
    };

    TestApp {
        router: build_app_router(state, &config),
        store,
    }
}

/// [`build_test_app_with`] using default reconcile settings.
pub fn build_test_app(provider: Arc<FakeProvider>) -> TestApp {
    build_test_app_with(provider, ReconcileConfig::default())
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    let request = Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn post_raw(app: Router, uri: &str, body: impl Into<String>) -> Response<Body> {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.into()))
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn post_json(app: Router, uri: &str, body: &Value) -> Response<Body> {
    post_raw(app, uri, body.to_string()).await
}

pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
