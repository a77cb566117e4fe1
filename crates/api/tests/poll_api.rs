//! Integration tests for poll-time reconciliation.

mod common;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::http::StatusCode;
use chrono::Utc;
use serde_json::json;
use wiremock::matchers::any;
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::{body_json, get, FakeProvider};
use dancegen_api::config::ReconcileConfig;
use dancegen_core::store::ResultStore;
use dancegen_core::task_result::{MediaKind, TaskResult, TaskStatus};
use dancegen_kie::history::HistoryRecord;
use dancegen_kie::{KieApi, KieApiError, KieConfig, ProviderReport, TaskProvider};

fn record(task_id: &str, age: chrono::Duration, payload: serde_json::Value) -> HistoryRecord {
    HistoryRecord {
        task_id: task_id.to_string(),
        created_at: Some(Utc::now() - age),
        payload,
    }
}

#[tokio::test]
async fn missing_task_id_is_bad_request() {
    let app = common::build_test_app(Arc::new(FakeProvider::default()));

    for uri in ["/api/v1/tasks/status", "/api/v1/tasks/status?taskId=%20%20"] {
        let response = get(app.router.clone(), uri).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["code"], "BAD_REQUEST");
    }
}

#[tokio::test]
async fn invalid_kind_is_bad_request() {
    let app = common::build_test_app(Arc::new(FakeProvider::default()));
    let response = get(app.router, "/api/v1/tasks/status?taskId=t&kind=hologram").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let json = body_json(response).await;
    assert_eq!(json["code"], "VALIDATION_ERROR");
    assert!(json["error"].as_str().unwrap().contains("hologram"));
}

#[tokio::test]
async fn kind_is_case_insensitive() {
    let provider = Arc::new(FakeProvider::default().with_task(
        "k1",
        json!({"data": {"taskId": "k1", "successFlag": 1, "resultUrls": ["https://cdn.example/k1.png"]}}),
    ));
    let app = common::build_test_app(provider);

    let response = get(app.router, "/api/v1/tasks/status?taskId=k1&kind=IMAGE").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["status"], "SUCCESS");
}

#[tokio::test]
async fn provider_success_is_cached() {
    let provider = Arc::new(FakeProvider::default().with_task(
        "p1",
        json!({"code": 200, "data": {"taskId": "p1", "successFlag": 1,
               "response": {"resultUrls": ["https://cdn.example/p1.mp4"]}}}),
    ));
    let app = common::build_test_app(provider.clone());

    let json = body_json(get(app.router.clone(), "/api/v1/tasks/status?taskId=p1").await).await;
    assert_eq!(json["status"], "SUCCESS");
    assert_eq!(json["resultUrls"], json!(["https://cdn.example/p1.mp4"]));
    assert_eq!(json["source"], "provider");

    let json = body_json(get(app.router, "/api/v1/tasks/status?taskId=p1").await).await;
    assert_eq!(json["source"], "cache");
    assert_eq!(provider.query_count(), 1);
}

#[tokio::test]
async fn provider_processing_is_reported() {
    let provider = Arc::new(
        FakeProvider::default().with_task("p2", json!({"data": {"taskId": "p2", "successFlag": 0}})),
    );
    let app = common::build_test_app(provider.clone());

    let json = body_json(get(app.router.clone(), "/api/v1/tasks/status?taskId=p2").await).await;
    assert_eq!(json["status"], "PROCESSING");
    assert_eq!(json["source"], "provider");
    assert!(json.get("resultUrls").is_none());

    // Video tasks never scan history.
    assert_eq!(provider.history_count(), 0);

    let entry = app.store.get("p2", Utc::now()).await.unwrap().unwrap();
    assert_eq!(entry.status, TaskStatus::Processing);
}

#[tokio::test]
async fn processing_cache_entry_is_rechecked() {
    let provider = Arc::new(FakeProvider::default().with_task(
        "p3",
        json!({"data": {"taskId": "p3", "state": "success", "resultUrls": ["https://cdn.example/p3.mp4"]}}),
    ));
    let app = common::build_test_app(provider.clone());
    app.store
        .put(TaskResult::new("p3", TaskStatus::Processing, vec![], None))
        .await
        .unwrap();

    let json = body_json(get(app.router, "/api/v1/tasks/status?taskId=p3").await).await;
    assert_eq!(json["status"], "SUCCESS");
    assert_eq!(json["source"], "provider");
    assert_eq!(provider.query_count(), 1);
}

#[tokio::test]
async fn cached_entry_counts_as_evidence_when_provider_fails() {
    let provider = Arc::new(FakeProvider::default());
    let app = common::build_test_app(provider.clone());
    app.store
        .put(TaskResult::new("p4", TaskStatus::Processing, vec![], None))
        .await
        .unwrap();

    let response = get(app.router, "/api/v1/tasks/status?taskId=p4").await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "PROCESSING");
    assert_eq!(json["source"], "cache");
}

#[tokio::test]
async fn unknown_task_reports_error_when_every_candidate_fails() {
    let server = MockServer::start().await;
    let api = KieApi::new(&KieConfig::with_base_url(server.uri())).unwrap();
    let app = common::build_test_app_with(Arc::new(api), ReconcileConfig::default());

    let response = get(app.router, "/api/v1/tasks/status?taskId=nope").await;
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);

    let json = body_json(response).await;
    assert_eq!(json["status"], "ERROR");
    assert_eq!(json["code"], "PROVIDER_UNAVAILABLE");
    assert!(json["error"].as_str().unwrap().contains("404"));

    // Three video endpoints, GET and POST each.
    assert_eq!(server.received_requests().await.unwrap().len(), 6);
}

#[tokio::test]
async fn slow_provider_hits_resolve_deadline_before_request_timeout() {
    let server = MockServer::start().await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
        .mount(&server)
        .await;

    let mut kie = KieConfig::with_base_url(server.uri());
    kie.request_timeout_secs = 1;
    let api = KieApi::new(&kie).unwrap();

    // Trying every candidate would take about 6s, past the 2s request timeout.
    let mut config = common::test_config();
    config.request_timeout_secs = 2;
    config.reconcile.resolve_timeout_secs = 1;
    let app = common::build_test_app_from(Arc::new(api), config);

    let started = std::time::Instant::now();
    let response = get(app.router, "/api/v1/tasks/status?taskId=slow").await;

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    assert!(started.elapsed() < Duration::from_secs(2));
    let json = body_json(response).await;
    assert_eq!(json["status"], "ERROR");
    assert_eq!(json["code"], "PROVIDER_UNAVAILABLE");
    assert!(json["error"].as_str().unwrap().contains("timed out"), "{json}");
}

#[tokio::test]
async fn resolve_deadline_falls_back_to_cached_entry() {
    let provider = Arc::new(FakeProvider::default().with_query_delay(Duration::from_secs(3)));
    let app = common::build_test_app_with(
        provider,
        ReconcileConfig {
            resolve_timeout_secs: 1,
            ..ReconcileConfig::default()
        },
    );
    app.store
        .put(TaskResult::new("d1", TaskStatus::Processing, vec![], None))
        .await
        .unwrap();

    let response = get(app.router, "/api/v1/tasks/status?taskId=d1").await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "PROCESSING");
    assert_eq!(json["source"], "cache");
}

/// Provider whose status query blows up.
struct PanickingProvider;

#[async_trait]
impl TaskProvider for PanickingProvider {
    async fn query_task(
        &self,
        _task_id: &str,
        _kind: MediaKind,
    ) -> Result<ProviderReport, KieApiError> {
        panic!("provider client bug")
    }

    async fn history_page(&self, _page: u32) -> Result<Vec<HistoryRecord>, KieApiError> {
        Ok(Vec::new())
    }

    async fn probe_url(&self, _url: &str) -> Result<bool, KieApiError> {
        Ok(false)
    }
}

#[tokio::test]
async fn aborted_resolution_is_internal_error() {
    let app = common::build_test_app_with(Arc::new(PanickingProvider), ReconcileConfig::default());

    let response = get(app.router, "/api/v1/tasks/status?taskId=boom").await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let json = body_json(response).await;
    assert_eq!(json["code"], "INTERNAL_ERROR");
    assert_eq!(json["error"], "An internal error occurred");
}

#[tokio::test]
async fn image_task_found_in_history() {
    let provider = Arc::new(
        FakeProvider::default()
            .with_history_page(vec![record("other", chrono::Duration::minutes(1), json!({"taskId": "other"}))])
            .with_history_page(vec![record(
                "h1",
                chrono::Duration::minutes(2),
                json!({"taskId": "h1", "successFlag": 1,
                       "resultJson": "{\"resultUrls\":[\"https://cdn.example/h1.png\"]}"}),
            )]),
    );
    let app = common::build_test_app(provider.clone());

    let json = body_json(get(app.router, "/api/v1/tasks/status?taskId=h1&kind=image").await).await;
    assert_eq!(json["status"], "SUCCESS");
    assert_eq!(json["resultUrls"], json!(["https://cdn.example/h1.png"]));
    assert_eq!(json["source"], "history");

    assert_eq!(provider.query_count(), 1);
    assert_eq!(provider.history_count(), 2);
    assert!(app.store.get("h1", Utc::now()).await.unwrap().is_some());
}

#[tokio::test]
async fn history_scan_stops_on_empty_page() {
    let provider = Arc::new(
        FakeProvider::default()
            .with_task("h2", json!({"data": {"taskId": "h2", "successFlag": 0}}))
            .with_history_page(vec![]),
    );
    let app = common::build_test_app(provider.clone());

    let json = body_json(get(app.router, "/api/v1/tasks/status?taskId=h2&kind=image").await).await;
    assert_eq!(json["status"], "PROCESSING");
    assert_eq!(json["source"], "provider");
    assert_eq!(provider.history_count(), 1);
}

#[tokio::test]
async fn history_scan_respects_page_limit() {
    let mut provider = FakeProvider::default();
    for _ in 0..8 {
        provider = provider.with_history_page(vec![record(
            "unrelated",
            chrono::Duration::minutes(1),
            json!({"taskId": "unrelated"}),
        )]);
    }
    let provider = Arc::new(provider);
    let app = common::build_test_app(provider.clone());

    let response = get(app.router, "/api/v1/tasks/status?taskId=h3&kind=image").await;
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(provider.history_count(), 5);
}

#[tokio::test]
async fn stuck_task_recovered_by_url_guess() {
    let provider = Arc::new(
        FakeProvider::default()
            .with_history_page(vec![record(
                "s1",
                chrono::Duration::hours(1),
                json!({"taskId": "s1", "successFlag": 0}),
            )])
            .with_live_url("https://files.example/s1_1.png"),
    );
    let reconcile = ReconcileConfig {
        url_guess_enabled: true,
        url_guess_template: "https://files.example/{task_id}_{candidate}.png".into(),
        url_guess_candidates: vec!["0".into(), "1".into()],
        ..ReconcileConfig::default()
    };
    let app = common::build_test_app_with(provider.clone(), reconcile);

    let json = body_json(get(app.router, "/api/v1/tasks/status?taskId=s1&kind=image").await).await;
    assert_eq!(json["status"], "SUCCESS");
    assert_eq!(json["resultUrls"], json!(["https://files.example/s1_1.png"]));
    assert_eq!(json["source"], "url_guess");
    assert_eq!(provider.probe_count(), 2);
}

#[tokio::test]
async fn url_guess_is_off_by_default() {
    let provider = Arc::new(
        FakeProvider::default()
            .with_history_page(vec![record(
                "s2",
                chrono::Duration::hours(1),
                json!({"taskId": "s2", "successFlag": 0}),
            )])
            .with_live_url("https://tempfile.aiquickdraw.com/s/anything.png"),
    );
    let app = common::build_test_app(provider.clone());

    let json = body_json(get(app.router, "/api/v1/tasks/status?taskId=s2&kind=image").await).await;
    assert_eq!(json["status"], "PROCESSING");
    assert_eq!(json["source"], "history");
    assert_eq!(provider.probe_count(), 0);
}

#[tokio::test]
async fn recent_task_is_not_guessed() {
    let provider = Arc::new(FakeProvider::default().with_history_page(vec![record(
        "s3",
        chrono::Duration::minutes(1),
        json!({"taskId": "s3", "successFlag": 0}),
    )]));
    let reconcile = ReconcileConfig {
        url_guess_enabled: true,
        ..ReconcileConfig::default()
    };
    let app = common::build_test_app_with(provider.clone(), reconcile);

    let json = body_json(get(app.router, "/api/v1/tasks/status?taskId=s3&kind=image").await).await;
    assert_eq!(json["status"], "PROCESSING");
    assert_eq!(provider.probe_count(), 0);
}

#[tokio::test]
async fn concurrent_polls_share_one_provider_query() {
    let provider = Arc::new(
        FakeProvider::default()
            .with_task(
                "c1",
                json!({"data": {"taskId": "c1", "successFlag": 1, "resultUrls": ["https://cdn.example/c1.mp4"]}}),
            )
            .with_query_delay(Duration::from_millis(100)),
    );
    let app = common::build_test_app(provider.clone());

    let polls = (0..5).map(|_| get(app.router.clone(), "/api/v1/tasks/status?taskId=c1"));
    let responses = futures::future::join_all(polls).await;

    for response in responses {
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["status"], "SUCCESS");
        assert_eq!(json["source"], "provider");
    }
    assert_eq!(provider.query_count(), 1);
}
