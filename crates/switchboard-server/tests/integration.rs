use std::sync::Arc;

use axum::http::StatusCode;
use http_body_util::BodyExt;
use switchboard_core::config::Config;
use switchboard_core::orchestrator::Orchestrator;
use switchboard_core::store::{MemoryRecordStore, RedbRecordStore, RecordStore};
use tempfile::TempDir;
use tower::ServiceExt;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

const CONFIG: &str = r#"
runner:
  timeout_secs: 5
actions:
  - name: ping
    description: Liveness probe
    command:
      program: echo
      args: ["pong"]
  - name: greet
    description: Print a greeting
    parameters:
      type: object
      properties:
        who: { type: string }
        loud: { type: boolean }
      required: [who]
    command:
      program: echo
      args: ["hello {{who}}"]
  - name: fail
    description: Always exits non-zero
    command:
      program: sh
      args: ["-c", "echo nope >&2; exit 4"]
  - name: orphan
    description: Cataloged without a command
  - name: slow
    description: Takes half a second
    command:
      program: sh
      args: ["-c", "sleep 0.5; echo done"]
"#;

fn orchestrator(store: Arc<dyn RecordStore>) -> Orchestrator {
    let config = Config::from_yaml(CONFIG).unwrap();
    Orchestrator::from_config(&config, &std::env::temp_dir(), store).unwrap()
}

fn app() -> axum::Router {
    switchboard_server::build_router(orchestrator(Arc::new(MemoryRecordStore::new())))
}

/// Send a GET request via `oneshot` and return (status, parsed JSON body).
async fn get(app: axum::Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let req = axum::http::Request::builder()
        .uri(uri)
        .body(axum::body::Body::empty())
        .unwrap();
    let response = app.oneshot(req).await.unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null);
    (status, json)
}

/// Send a POST request with a raw body via `oneshot` and return (status, parsed JSON body).
async fn post_raw(app: axum::Router, uri: &str, body: Vec<u8>) -> (StatusCode, serde_json::Value) {
    let req = axum::http::Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(axum::body::Body::from(body))
        .unwrap();
    let response = app.oneshot(req).await.unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null);
    (status, json)
}

async fn post_json(
    app: axum::Router,
    uri: &str,
    body: serde_json::Value,
) -> (StatusCode, serde_json::Value) {
    post_raw(app, uri, serde_json::to_vec(&body).unwrap()).await
}

async fn enable(app: &axum::Router, name: &str) {
    let (status, _) = post_json(
        app.clone(),
        &format!("/actions/{name}/toggle"),
        serde_json::json!({ "enable": true }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

// ---------------------------------------------------------------------------
// Health / listing
// ---------------------------------------------------------------------------

#[tokio::test]
async fn health_returns_ok() {
    let req = axum::http::Request::builder()
        .uri("/health")
        .body(axum::body::Body::empty())
        .unwrap();
    let response = app().oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&body[..], b"ok");
}

#[tokio::test]
async fn list_actions_returns_catalog_with_default_records() {
    let (status, body) = get(app(), "/actions").await;
    assert_eq!(status, StatusCode::OK);

    let actions = body.as_array().unwrap();
    let names: Vec<_> = actions.iter().map(|a| a["name"].as_str().unwrap()).collect();
    assert_eq!(names, vec!["ping", "greet", "fail", "orphan", "slow"]);

    let ping = &actions[0];
    assert_eq!(ping["enabled"], false);
    assert_eq!(ping["status"], "idle");
    assert_eq!(ping["mapped"], true);
    assert!(ping["lastRunAt"].is_null());
    assert_eq!(actions[3]["mapped"], false);
    assert_eq!(actions[1]["parameters"]["required"][0], "who");
}

// ---------------------------------------------------------------------------
// Toggle / status
// ---------------------------------------------------------------------------

#[tokio::test]
async fn toggle_then_status_reflects_enabled() {
    let app = app();
    let (status, body) = post_json(
        app.clone(),
        "/actions/ping/toggle",
        serde_json::json!({ "enable": true }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["enabled"], true);

    let (status, body) = get(app, "/actions/ping/status").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["enabled"], true);
    assert_eq!(body["status"], "idle");
}

#[tokio::test]
async fn toggle_rejects_non_boolean_enable() {
    for bad in [
        serde_json::json!({ "enable": "yes" }),
        serde_json::json!({ "enable": 1 }),
        serde_json::json!({}),
    ] {
        let (status, body) = post_json(app(), "/actions/ping/toggle", bad).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("enable"));
    }
}

#[tokio::test]
async fn unknown_action_is_404_everywhere() {
    let (status, body) = get(app(), "/actions/unknown/status").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().unwrap().contains("unknown"));

    let (status, _) = post_json(
        app(),
        "/actions/unknown/toggle",
        serde_json::json!({ "enable": true }),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = post_json(
        app(),
        "/actions/trigger",
        serde_json::json!({ "actionName": "unknown", "parameters": {} }),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// ---------------------------------------------------------------------------
// Trigger
// ---------------------------------------------------------------------------

#[tokio::test]
async fn trigger_disabled_action_is_400_and_status_unchanged() {
    let app = app();
    let (_, before) = get(app.clone(), "/actions/ping/status").await;
    let (status, body) = post_json(
        app.clone(),
        "/actions/trigger",
        serde_json::json!({ "actionName": "ping", "parameters": {} }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("disabled"));

    let (_, after) = get(app, "/actions/ping/status").await;
    assert_eq!(before, after);
}

#[tokio::test]
async fn ping_scenario_completes_with_pong() {
    let app = app();
    enable(&app, "ping").await;

    let (status, body) = post_json(
        app.clone(),
        "/actions/trigger",
        serde_json::json!({ "actionName": "ping", "parameters": {} }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["actionName"], "ping");
    assert_eq!(body["status"], "completed");
    assert_eq!(body["lastResult"], "pong");
    assert!(!body["runId"].as_str().unwrap().is_empty());

    let (_, status_body) = get(app, "/actions/ping/status").await;
    assert_eq!(status_body["status"], "completed");
    assert_eq!(status_body["lastResult"], "pong");
    assert_eq!(status_body["lastRunAt"], body["lastRunAt"]);
}

#[tokio::test]
async fn trigger_without_parameters_field_uses_empty_object() {
    let app = app();
    enable(&app, "ping").await;
    let (status, _) = post_json(
        app,
        "/actions/trigger",
        serde_json::json!({ "actionName": "ping" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn trigger_renders_parameters_into_command() {
    let app = app();
    enable(&app, "greet").await;
    let (status, body) = post_json(
        app,
        "/actions/trigger",
        serde_json::json!({ "actionName": "greet", "parameters": { "who": "world", "loud": true } }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["lastResult"], "hello world --loud=true");
}

#[tokio::test]
async fn invalid_parameters_are_400_with_violations() {
    let app = app();
    enable(&app, "greet").await;
    let (status, body) = post_json(
        app.clone(),
        "/actions/trigger",
        serde_json::json!({ "actionName": "greet", "parameters": { "loud": "very" } }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let violations = body["violations"].as_array().unwrap();
    let fields: Vec<_> = violations.iter().map(|v| v["field"].as_str().unwrap()).collect();
    assert!(fields.contains(&"who"));
    assert!(fields.contains(&"loud"));

    let (_, status_body) = get(app, "/actions/greet/status").await;
    assert_eq!(status_body["status"], "idle");
}

#[tokio::test]
async fn malformed_trigger_body_is_400() {
    let (status, body) = post_raw(app(), "/actions/trigger", b"{not json".to_vec()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    let (status, _) = post_json(
        app(),
        "/actions/trigger",
        serde_json::json!({ "parameters": {} }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn failing_command_is_500_and_recorded_as_error() {
    let app = app();
    enable(&app, "fail").await;
    let (status, body) = post_json(
        app.clone(),
        "/actions/trigger",
        serde_json::json!({ "actionName": "fail", "parameters": {} }),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"].as_str().unwrap().contains("code 4"));

    let (_, status_body) = get(app, "/actions/fail/status").await;
    assert_eq!(status_body["status"], "error");
    assert!(status_body["lastResult"].as_str().unwrap().contains("nope"));
}

#[tokio::test]
async fn unmapped_action_is_500_and_recorded_as_error() {
    let app = app();
    enable(&app, "orphan").await;
    let (status, _) = post_json(
        app.clone(),
        "/actions/trigger",
        serde_json::json!({ "actionName": "orphan", "parameters": {} }),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

    let (_, status_body) = get(app, "/actions/orphan/status").await;
    assert_eq!(status_body["status"], "error");
}

#[tokio::test]
async fn concurrent_triggers_admit_one_run() {
    let app = app();
    enable(&app, "slow").await;
    let body = serde_json::json!({ "actionName": "slow", "parameters": {} });
    let (first, second) = tokio::join!(
        post_json(app.clone(), "/actions/trigger", body.clone()),
        post_json(app.clone(), "/actions/trigger", body.clone()),
    );

    let mut statuses = vec![first.0, second.0];
    statuses.sort();
    assert_eq!(statuses, vec![StatusCode::OK, StatusCode::BAD_REQUEST]);

    let rejected = if first.0 == StatusCode::BAD_REQUEST { &first.1 } else { &second.1 };
    assert!(rejected["error"].as_str().unwrap().contains("already running"));

    let (_, status_body) = get(app, "/actions/slow/status").await;
    assert_eq!(status_body["status"], "completed");
    assert_eq!(status_body["lastResult"], "done");
}

#[tokio::test]
async fn records_persist_across_routers_with_redb() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("records.db");

    {
        let store = Arc::new(RedbRecordStore::open(&path).unwrap());
        let app = switchboard_server::build_router(orchestrator(store));
        enable(&app, "ping").await;
        let (status, _) = post_json(
            app,
            "/actions/trigger",
            serde_json::json!({ "actionName": "ping", "parameters": {} }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    let store = Arc::new(RedbRecordStore::open(&path).unwrap());
    let app = switchboard_server::build_router(orchestrator(store));
    let (_, body) = get(app, "/actions/ping/status").await;
    assert_eq!(body["enabled"], true);
    assert_eq!(body["status"], "completed");
    assert_eq!(body["lastResult"], "pong");
}
