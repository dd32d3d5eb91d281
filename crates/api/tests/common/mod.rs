//! Shared helpers for API integration tests.
//!
//! Tests run the full router over a [`MemoryStore`], so no Redis or
//! worker instances are required unless a test spawns its own mock.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use foreman_api::config::ServerConfig;
use foreman_api::router::build_app_router;
use foreman_api::state::AppState;
use foreman_dispatch::{InstanceRegistry, TaskService};
use foreman_store::{MemoryStore, Store};

/// Build a test `ServerConfig` with safe defaults and no API key.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        redis_url: "redis://127.0.0.1:6379/0".to_string(),
        registry_snapshot_path: String::new(),
        api_key: None,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        health_check_interval_secs: 30,
        health_check_timeout_secs: 5,
        run_timeout_secs: 5,
        dispatch_poll_ms: 10,
        sync_wait_poll_ms: 10,
    }
}

/// Build an [`AppState`] over a fresh in-memory store.
///
/// The registry has no snapshot path, so nothing touches the filesystem.
pub fn test_state(config: ServerConfig) -> AppState {
    let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
    AppState {
        config: Arc::new(config),
        store: Arc::clone(&store),
        registry: Arc::new(InstanceRegistry::new()),
        tasks: Arc::new(TaskService::new(store, Duration::from_millis(10))),
        http: reqwest::Client::new(),
    }
}

/// Build the full application router plus the state behind it, so tests
/// can reach into the registry and store directly.
pub fn build_test_app() -> (Router, AppState) {
    let state = test_state(test_config());
    (build_app_router(state.clone()), state)
}

/// Same as [`build_test_app`] but with an API key configured.
pub fn build_test_app_with_api_key(key: &str) -> (Router, AppState) {
    let mut config = test_config();
    config.api_key = Some(key.to_string());
    let state = test_state(config);
    (build_app_router(state.clone()), state)
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    app.oneshot(
        Request::builder()
            .uri(uri)
            .body(Body::empty())
            .unwrap(),
    )
    .await
    .unwrap()
}

pub async fn post_json(app: Router, uri: &str, body: Value) -> Response<Body> {
    app.oneshot(
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
    )
    .await
    .unwrap()
}

pub async fn delete(app: Router, uri: &str) -> Response<Body> {
    app.oneshot(
        Request::builder()
            .method("DELETE")
            .uri(uri)
            .body(Body::empty())
            .unwrap(),
    )
    .await
    .unwrap()
}

/// Collect a response body and parse it as JSON.
pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
