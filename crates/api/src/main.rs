use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use pixora_core::catalog::ModelCatalog;
use pixora_inference::{CredentialPool, InferenceApi};
use pixora_pipeline::backend::HttpInferenceBackend;
use pixora_pipeline::storage::LocalObjectStore;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pixora_api::background;
use pixora_api::config::ServerConfig;
use pixora_api::router::build_app_router;
use pixora_api::state::AppState;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "pixora_api=debug,pixora_pipeline=debug,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");

    // --- Database ---
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let pool = pixora_db::create_pool(&database_url)
        .await
        .expect("Failed to connect to database");
    tracing::info!("Database connection pool created");

    pixora_db::health_check(&pool)
        .await
        .expect("Database health check failed");
    tracing::info!("Database health check passed");

    pixora_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database migrations applied");

    // --- Model catalog ---
    let catalog = match &config.model_catalog_path {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .unwrap_or_else(|e| panic!("Failed to read model catalog '{path}': {e}"));
            ModelCatalog::from_json_str(&raw)
                .unwrap_or_else(|e| panic!("Invalid model catalog '{path}': {e}"))
        }
        None => ModelCatalog::default(),
    };
    tracing::info!(
        models = catalog.models.len(),
        styles = catalog.styles.len(),
        "Model catalog loaded"
    );

    // --- Inference backend ---
    let credentials = CredentialPool::new(config.inference_api_keys.clone())
        .expect("INFERENCE_API_KEYS must contain at least one key");
    let api = InferenceApi::new(Duration::from_secs(config.inference_timeout_secs))
        .expect("Failed to build inference HTTP client");
    tracing::info!(
        credentials = credentials.len(),
        timeout_secs = config.inference_timeout_secs,
        "Inference backend configured"
    );
    let backend = Arc::new(HttpInferenceBackend::new(api, credentials));

    // --- Image storage ---
    let store = Arc::new(LocalObjectStore::new(&config.storage_root));
    tracing::info!(root = %config.storage_root, "Image storage ready");

    // --- App state ---
    let state = AppState::new(pool.clone(), config.clone(), Arc::new(catalog), backend, store);

    // --- Background tasks ---
    let event_log_handle = tokio::spawn(background::event_log::run(state.event_bus.subscribe()));

    let janitor_cancel = CancellationToken::new();
    let janitor_handle = tokio::spawn(background::job_janitor::run(
        pool.clone(),
        config.job_stale_after_mins,
        janitor_cancel.clone(),
    ));

    let generations = state.generations.clone();

    // --- Router ---
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

    // Running jobs are cancelled, which refunds their credits.
    let drain = Duration::from_secs(config.shutdown_timeout_secs);
    if tokio::time::timeout(drain, generations.shutdown()).await.is_err() {
        tracing::warn!(
            timeout_secs = config.shutdown_timeout_secs,
            "Generation jobs did not finish in time; the janitor will mark them abandoned"
        );
    }

    janitor_cancel.cancel();
    let _ = tokio::time::timeout(Duration::from_secs(5), janitor_handle).await;
    tracing::info!("Job janitor stopped");

    event_log_handle.abort();

    tracing::info!("Graceful shutdown complete");
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix) so the server
/// shuts down cleanly whether stopped interactively or by a process
/// manager.
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
