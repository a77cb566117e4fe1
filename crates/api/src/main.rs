use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use dancegen_api::background;
use dancegen_api::config::ServerConfig;
use dancegen_api::reconcile::Reconciler;
use dancegen_api::router::build_app_router;
use dancegen_api::state::AppState;
use dancegen_core::store::{MemoryResultStore, ResultStore};
use dancegen_kie::{KieApi, KieConfig, TaskProvider};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    let json_logs = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "dancegen_api=debug,dancegen_kie=debug,tower_http=debug".into()
            }),
        )
        .with(json_logs.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json_logs).then(tracing_subscriber::fmt::layer))
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    let kie_config = KieConfig::from_env();
    config
        .validate(&kie_config)
        .unwrap_or_else(|e| panic!("Invalid configuration: {e}"));
    tracing::info!(
        host = %config.host,
        port = %config.port,
        resolve_timeout_secs = config.reconcile.resolve_timeout_secs,
        "Loaded server configuration",
    );

    // --- Result store ---
    let store: Arc<dyn ResultStore> = match &config.database_url {
        Some(database_url) => {
            let pool = dancegen_db::create_pool(database_url)
                .await
                .expect("Failed to connect to database");
            tracing::info!("Database connection pool created");

            dancegen_db::health_check(&pool)
                .await
                .expect("Database health check failed");

            dancegen_db::run_migrations(&pool)
                .await
                .expect("Failed to run database migrations");
            tracing::info!("Database migrations applied");

            Arc::new(dancegen_db::PgResultStore::new(pool, config.cache.ttl()))
        }
        None => {
            tracing::warn!("DATABASE_URL not set, cached results will not survive a restart");
            Arc::new(MemoryResultStore::new(config.cache.ttl()))
        }
    };
    tracing::info!(backend = store.backend(), ttl_secs = config.cache.ttl_secs, "Result store ready");

    // --- Provider client ---
    if kie_config.api_key.is_none() {
        tracing::warn!("KIE_API_KEY not set, provider requests will be unauthenticated");
    }
    let provider: Arc<dyn TaskProvider> =
        Arc::new(KieApi::new(&kie_config).expect("Failed to build provider HTTP client"));
    tracing::info!(base_url = %kie_config.base_url, "Provider client ready");

    // --- Background cache sweep ---
    let sweep_cancel = tokio_util::sync::CancellationToken::new();
    let sweep_handle = tokio::spawn(background::cache_sweep::run(
        Arc::clone(&store),
        Duration::from_secs(config.cache.sweep_interval_secs),
        sweep_cancel.clone(),
    ));

    // --- App state ---
    let reconciler = Arc::new(Reconciler::new(
        Arc::clone(&store),
        provider,
        config.reconcile.clone(),
    ));
    let state = AppState { store, reconciler };

    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");

    sweep_cancel.cancel();
    let _ = tokio::time::timeout(
        Duration::from_secs(config.shutdown_timeout_secs),
        sweep_handle,
    )
    .await;
    tracing::info!("Graceful shutdown complete");
}

/// Wait for SIGINT (Ctrl-C) or, on Unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
