// Integration tests for the HTTP control API

mod common;

use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};
use tempfile::TempDir;

use tabscribe::audio::ReplayCapture;
use tabscribe::session::MemoryStore;
use tabscribe::transcribe::OrchestratorConfig;
use tabscribe::{
    create_router, AppState, FileSink, Notifier, SessionController, TranscriptionOrchestrator,
};

async fn spawn_server() -> (String, TempDir) {
    let output_dir = TempDir::new().unwrap();
    let notifier = Notifier::default();
    let orchestrator = Arc::new(TranscriptionOrchestrator::new(
        None,
        common::stub_engine_cell(vec![]),
        Arc::new(FileSink::new(output_dir.path())),
        notifier.clone(),
        OrchestratorConfig::default(),
    ));
    let capture = Arc::new(
        ReplayCapture::from_bytes(common::sample_wav())
            .with_cadence(Duration::from_millis(5))
            .with_chunk_bytes(4096),
    );
    let controller = SessionController::new(
        capture,
        Arc::new(MemoryStore::new()),
        orchestrator,
        notifier,
    )
    .await
    .unwrap();

    let app = create_router(AppState::new(controller));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (base, output_dir)
}

#[tokio::test]
async fn test_health_endpoint() {
    let (base, _dir) = spawn_server().await;
    let resp = reqwest::get(format!("{base}/health")).await.unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_session_lifecycle_over_http() {
    let (base, _dir) = spawn_server().await;
    let client = reqwest::Client::new();

    // Idle to start with
    let status: Value = client
        .get(format!("{base}/session/status"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(status["recording"], false);

    let resp = client
        .post(format!("{base}/session/start"))
        .json(&json!({ "target_id": "tab-7", "title": "接口测试" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["result"], "started");

    let status: Value = client
        .get(format!("{base}/session/status"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(status["recording"], true);
    assert_eq!(status["target_id"], "tab-7");

    let resp = client
        .post(format!("{base}/session/pause"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let resp = client
        .post(format!("{base}/session/resume"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let resp = client
        .post(format!("{base}/session/stop"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
}

#[tokio::test]
async fn test_conflicting_commands_return_409() {
    let (base, _dir) = spawn_server().await;
    let client = reqwest::Client::new();

    // Pause with no session
    let resp = client
        .post(format!("{base}/session/pause"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 409);
    let body: Value = resp.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("no active"));

    // Double start
    client
        .post(format!("{base}/session/start"))
        .json(&json!({ "target_id": "tab-1", "title": "One" }))
        .send()
        .await
        .unwrap();
    let resp = client
        .post(format!("{base}/session/start"))
        .json(&json!({ "target_id": "tab-2", "title": "Two" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 409);
}
