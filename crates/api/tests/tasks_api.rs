//! Integration tests for the task endpoints, including a full dispatch
//! round trip against a mock worker instance.

mod common;

use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use axum::routing::{get as axum_get, post as axum_post};
use axum::{Json, Router};
use common::{body_json, build_test_app, get, post_json};
use foreman_dispatch::{Dispatcher, InstanceClient, ResultListener};
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;

#[tokio::test]
async fn run_async_returns_task_id_and_pending_status() {
    let (app, _state) = build_test_app();

    let response = post_json(app.clone(), "/api/v1/run_async", json!({"prompt": "a cat"})).await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    let task_id = json["task_id"].as_str().expect("task_id must be returned");

    let response = get(app.clone(), &format!("/api/v1/tasks/{task_id}")).await;
    assert_eq!(response.status(), StatusCode::OK);
    let status = body_json(response).await;
    assert_eq!(status["status"], "pending");

    // Idempotent reads: no dispatcher runs, so a second read is identical.
    let again = body_json(get(app, &format!("/api/v1/tasks/{task_id}")).await).await;
    assert_eq!(again, status);
}

#[tokio::test]
async fn unknown_task_id_is_404() {
    let (app, _state) = build_test_app();

    let response = get(app, "/api/v1/tasks/no-such-task").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["code"], "NOT_FOUND");
}

/// Serve a mock worker that echoes the payload from `POST /run`.
async fn spawn_echo_worker() -> String {
    let app = Router::new()
        .route(
            "/run",
            axum_post(|Json(payload): Json<Value>| async move { Json(json!({"echo": payload})) }),
        )
        .route("/healthz", axum_get(|| async { StatusCode::OK }));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

#[tokio::test]
async fn sync_run_round_trips_through_a_worker() {
    let (app, state) = build_test_app();
    let worker_url = spawn_echo_worker().await;
    state.registry.add(&worker_url, None).await.unwrap();

    // Run the background services the binary would start.
    let cancel = CancellationToken::new();
    tokio::spawn(ResultListener::run(
        Arc::clone(&state.store),
        cancel.child_token(),
    ));
    let dispatcher = Dispatcher::new(
        Arc::clone(&state.store),
        Arc::clone(&state.registry),
        InstanceClient::new(Some(Duration::from_secs(5))),
        Duration::from_millis(10),
    );
    tokio::spawn(dispatcher.run(cancel.child_token()));

    let payload = json!({"prompt": "a cat"});
    let response = tokio::time::timeout(
        Duration::from_secs(5),
        post_json(app.clone(), "/api/v1/run", payload.clone()),
    )
    .await
    .expect("sync run must finish");

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!({"echo": payload}));

    cancel.cancel();
}

#[tokio::test]
async fn async_run_reaches_completed_via_polling() {
    let (app, state) = build_test_app();
    let worker_url = spawn_echo_worker().await;
    state.registry.add(&worker_url, None).await.unwrap();

    let cancel = CancellationToken::new();
    let dispatcher = Dispatcher::new(
        Arc::clone(&state.store),
        Arc::clone(&state.registry),
        InstanceClient::new(Some(Duration::from_secs(5))),
        Duration::from_millis(10),
    );
    tokio::spawn(dispatcher.run(cancel.child_token()));

    let response = post_json(app.clone(), "/api/v1/run_async", json!({"n": 7})).await;
    let task_id = body_json(response).await["task_id"]
        .as_str()
        .unwrap()
        .to_string();

    // Poll until the dispatcher finishes the task.
    let mut last = json!(null);
    for _ in 0..100 {
        last = body_json(get(app.clone(), &format!("/api/v1/tasks/{task_id}")).await).await;
        if last["status"] == "completed" {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    assert_eq!(last["status"], "completed");
    assert_eq!(last["result"], json!({"echo": {"n": 7}}));
    assert_eq!(last["instance_url"], json!(worker_url));

    cancel.cancel();
}
