#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, Response, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use pixora_core::catalog::{ModelCatalog, ModelConfig};
use pixora_core::generation::InferencePayload;
use pixora_core::roles::{ROLE_ADMIN, ROLE_AUTHENTICATED};
use pixora_core::types::UserId;
use pixora_inference::InferenceImage;
use pixora_pipeline::backend::{InferenceBackend, InferenceFailure};
use pixora_pipeline::storage::LocalObjectStore;
use sqlx::PgPool;
use tower::ServiceExt;

use pixora_api::auth::jwt::{generate_access_token, JwtConfig};
use pixora_api::config::ServerConfig;
use pixora_api::router::build_app_router;
use pixora_api::state::AppState;

pub const TEST_SECRET: &str = "test-secret-that-is-long-enough-for-hmac";

const PNG_BYTES: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0];

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 5,
        jwt: JwtConfig {
            secret: TEST_SECRET.to_string(),
            access_token_expiry_mins: 15,
        },
        inference_api_keys: vec!["hf_test".to_string()],
        inference_timeout_secs: 5,
        storage_root: std::env::temp_dir()
            .join(format!("pixora-test-{}", uuid::Uuid::new_v4()))
            .to_string_lossy()
            .into_owned(),
        model_catalog_path: None,
        job_stale_after_mins: 30,
    }
}

// ---------------------------------------------------------------------------
// Inference backend
// ---------------------------------------------------------------------------

/// Replays scripted upstream statuses, then returns a PNG for every call.
#[derive(Default)]
pub struct ScriptedBackend {
    failures: Mutex<VecDeque<u16>>,
}

impl ScriptedBackend {
    pub fn failing_with(statuses: impl IntoIterator<Item = u16>) -> Arc<Self> {
        Arc::new(Self {
            failures: Mutex::new(statuses.into_iter().collect()),
        })
    }
}

#[async_trait]
impl InferenceBackend for ScriptedBackend {
    async fn generate(
        &self,
        _model: &ModelConfig,
        _payload: &InferencePayload,
    ) -> Result<InferenceImage, InferenceFailure> {
        match self.failures.lock().unwrap().pop_front() {
            Some(status) => Err(InferenceFailure {
                status: Some(status),
                message: format!("upstream returned {status}"),
            }),
            None => Ok(InferenceImage {
                bytes: PNG_BYTES.to_vec(),
                content_type: Some("image/png".into()),
            }),
        }
    }

    fn rotate_credential(&self) {}
}

// ---------------------------------------------------------------------------
// App construction
// ---------------------------------------------------------------------------

/// Build the full application router (same middleware stack as `main.rs`)
/// with an upstream that always succeeds.
pub fn build_test_app(pool: PgPool) -> Router {
    build_test_app_with(pool, Arc::new(ScriptedBackend::default()))
}

pub fn build_test_app_with(pool: PgPool, backend: Arc<ScriptedBackend>) -> Router {
    let config = test_config();
    let store = Arc::new(LocalObjectStore::new(&config.storage_root));
    let state = AppState::new(
        pool,
        config.clone(),
        Arc::new(ModelCatalog::default()),
        backend,
        store,
    );
    build_app_router(state, &config)
}

// ---------------------------------------------------------------------------
// Tokens
// ---------------------------------------------------------------------------

pub fn token(user_id: UserId, role: &str, premium: bool) -> String {
    let config = test_config();
    generate_access_token(user_id, role, premium, &config.jwt).unwrap()
}

pub fn user_token(user_id: UserId) -> String {
    token(user_id, ROLE_AUTHENTICATED, false)
}

pub fn admin_token(user_id: UserId) -> String {
    token(user_id, ROLE_ADMIN, false)
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

async fn send(
    app: Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<serde_json::Value>,
) -> Response<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    app.oneshot(request).await.unwrap()
}

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    send(app, "GET", uri, None, None).await
}

pub async fn get_auth(app: Router, uri: &str, token: &str) -> Response<Body> {
    send(app, "GET", uri, Some(token), None).await
}

pub async fn post_json(
    app: Router,
    uri: &str,
    token: &str,
    body: serde_json::Value,
) -> Response<Body> {
    send(app, "POST", uri, Some(token), Some(body)).await
}

pub async fn post_auth(app: Router, uri: &str, token: &str) -> Response<Body> {
    send(app, "POST", uri, Some(token), None).await
}

pub async fn patch_json(
    app: Router,
    uri: &str,
    token: &str,
    body: serde_json::Value,
) -> Response<Body> {
    send(app, "PATCH", uri, Some(token), Some(body)).await
}

pub async fn delete_auth(app: Router, uri: &str, token: &str) -> Response<Body> {
    send(app, "DELETE", uri, Some(token), None).await
}

/// Collect a response body as JSON.
pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// Poll `GET /api/v1/generations/{id}` until the job leaves `running`.
pub async fn wait_for_job(app: &Router, job_id: i64, token: &str) -> serde_json::Value {
    tokio::time::timeout(Duration::from_secs(10), async {
        loop {
            let response =
                get_auth(app.clone(), &format!("/api/v1/generations/{job_id}"), token).await;
            assert_eq!(response.status(), StatusCode::OK);
            let json = body_json(response).await;
            if json["data"]["status"] != "running" {
                return json["data"].clone();
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .expect("generation job did not finish in time")
}
