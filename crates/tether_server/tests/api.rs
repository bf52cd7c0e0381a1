//! HTTP surface behavior over the in-memory transport and sink.

use std::sync::Arc;
use std::time::Duration;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use tower::ServiceExt;

use tether_core::sink::memory::MemorySink;
use tether_core::transport::memory::{MemoryTransport, CREDENTIAL_FILE};
use tether_core::{
    AccountId, CloseCause, ConnectionEvent, CredentialSink, OrchestratorConfig,
    PairingOrchestrator, PairingTransport,
};
use tether_server::{router, AppState};

const ACCOUNT: &str = "2348140825959";

struct TestApp {
    app: Router,
    orchestrator: Arc<PairingOrchestrator>,
    transport: Arc<MemoryTransport>,
    _staging_root: tempfile::TempDir,
}

fn test_app() -> TestApp {
    let staging_root = tempfile::tempdir().expect("tempdir");
    let transport = Arc::new(MemoryTransport::new());
    let sink = Arc::new(MemorySink::new());
    let orchestrator = Arc::new(PairingOrchestrator::new(
        Arc::clone(&transport) as Arc<dyn PairingTransport>,
        sink as Arc<dyn CredentialSink>,
        staging_root.path(),
        OrchestratorConfig::default(),
    ));
    let app = router(AppState::new(Arc::clone(&orchestrator)));
    TestApp {
        app,
        orchestrator,
        transport,
        _staging_root: staging_root,
    }
}

fn account() -> AccountId {
    AccountId::parse(ACCOUNT).expect("valid account")
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(value) => {
            builder = builder.header("content-type", "application/json");
            Body::from(value.to_string())
        }
        None => Body::empty(),
    };
    let response = app
        .clone()
        .oneshot(builder.body(body).expect("request"))
        .await
        .expect("response");
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("json body")
    };
    (status, value)
}

async fn wait_for_status(app: &Router, id: &str, expected: &str) {
    for _ in 0..400 {
        let (status, body) = send(app, "GET", &format!("/sessions/{id}/status"), None).await;
        if status == StatusCode::OK && body["status"] == expected {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("session {id} never reached status {expected}");
}

#[tokio::test]
async fn pairing_lifecycle_over_http() {
    let t = test_app();
    let account = account();

    // Create: fresh account gets a formatted pairing code.
    let (status, body) = send(
        &t.app,
        "POST",
        "/sessions",
        Some(json!({ "account": ACCOUNT })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let id = body["id"].as_str().expect("id").to_string();
    assert!(!id.is_empty());
    assert_eq!(body["account"], ACCOUNT);
    let code = body["pairingCode"].as_str().expect("pairing code");
    assert!(code.contains('-'), "code should be grouped: {code}");

    // Nothing has happened on the wire yet.
    let (status, body) = send(&t.app, "GET", &format!("/sessions/{id}/status"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "waiting");
    assert_eq!(body["connectedAt"], Value::Null);

    // Handshake completes.
    t.transport
        .write_credential(&account, CREDENTIAL_FILE, b"{}")
        .await
        .expect("stage credentials");
    assert!(t.transport.emit(&account, ConnectionEvent::Open).await);
    wait_for_status(&t.app, &id, "connected").await;

    let (_, body) = send(&t.app, "GET", &format!("/sessions/{id}/status"), None).await;
    assert!(body["connectedAt"].is_string());

    // Connected listing includes exactly this session.
    let (status, body) = send(&t.app, "GET", "/sessions", None).await;
    assert_eq!(status, StatusCode::OK);
    let sessions = body["sessions"].as_array().expect("sessions");
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0]["id"], id.as_str());
    assert_eq!(sessions[0]["account"], ACCOUNT);

    // Forced disconnect goes through the logout branch.
    let (status, _) = send(
        &t.app,
        "POST",
        &format!("/sessions/{id}/disconnect"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    wait_for_status(&t.app, &id, "disconnected").await;

    let (status, body) = send(&t.app, "GET", "/sessions", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["sessions"].as_array().expect("sessions").len(), 0);

    // Still queryable after teardown, and disconnect stays idempotent.
    let (status, body) = send(&t.app, "GET", &format!("/sessions/{id}/status"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "disconnected");
    let (status, body) = send(
        &t.app,
        "POST",
        &format!("/sessions/{id}/disconnect"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "disconnected");
}

#[tokio::test]
async fn invalid_account_is_rejected_without_state() {
    let t = test_app();

    for bad in ["0348140825959", "12345", "notdigits12"] {
        let (status, body) = send(
            &t.app,
            "POST",
            "/sessions",
            Some(json!({ "account": bad })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "input: {bad}");
        assert!(body["error"].is_string());
    }

    // No session record was created for any rejected input.
    assert!(t.orchestrator.registry().is_empty());
}

#[tokio::test]
async fn unknown_session_ids_are_not_found() {
    let t = test_app();

    let (status, body) = send(&t.app, "GET", "/sessions/9999999999-1/status", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].is_string());

    let (status, _) = send(&t.app, "POST", "/sessions/9999999999-1/disconnect", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn transport_failure_surfaces_as_server_error() {
    let t = test_app();
    t.transport.fail_next_connect();

    let (status, body) = send(
        &t.app,
        "POST",
        "/sessions",
        Some(json!({ "account": ACCOUNT })),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"].is_string());
    assert!(t.orchestrator.registry().is_empty());
}

#[tokio::test]
async fn recoverable_drop_then_resume_issues_no_code() {
    let t = test_app();
    let account = account();

    let (_, body) = send(
        &t.app,
        "POST",
        "/sessions",
        Some(json!({ "account": ACCOUNT })),
    )
    .await;
    let id = body["id"].as_str().expect("id").to_string();

    t.transport
        .write_credential(&account, CREDENTIAL_FILE, b"{}")
        .await
        .expect("stage credentials");
    t.transport
        .emit(
            &account,
            ConnectionEvent::Close(CloseCause::Recoverable("socket reset".to_string())),
        )
        .await;
    wait_for_status(&t.app, &id, "disconnected").await;

    let (status, body) = send(
        &t.app,
        "POST",
        "/sessions",
        Some(json!({ "account": ACCOUNT })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.get("pairingCode"), None);
    assert_ne!(body["id"].as_str().expect("id"), id);
}

#[tokio::test]
async fn health_answers() {
    let t = test_app();
    let (status, body) = send(&t.app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}
