// Integration tests for the recording session state machine
//
// These tests drive the controller through its lifecycle with a replay
// capture source, a stub local engine, and a temporary delivery directory.

mod common;

use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;
use tokio::time::timeout;

use tabscribe::audio::ReplayCapture;
use tabscribe::session::{JsonFileStore, MemoryStore, SessionStore};
use tabscribe::transcribe::OrchestratorConfig;
use tabscribe::{
    Error, FileSink, Notification, Notifier, Segment, SessionController, TranscriptionOrchestrator,
};

struct Harness {
    controller: SessionController,
    notifier: Notifier,
    output_dir: TempDir,
}

async fn harness(store: Arc<dyn SessionStore>, segments: Vec<Segment>) -> Harness {
    let output_dir = TempDir::new().unwrap();
    let notifier = Notifier::default();
    let sink = Arc::new(FileSink::new(output_dir.path()));
    let orchestrator = Arc::new(TranscriptionOrchestrator::new(
        None,
        common::stub_engine_cell(segments),
        sink,
        notifier.clone(),
        OrchestratorConfig::default(),
    ));
    let capture = Arc::new(
        ReplayCapture::from_bytes(common::sample_wav())
            .with_cadence(Duration::from_millis(5))
            .with_chunk_bytes(4096),
    );
    let controller = SessionController::new(capture, store, orchestrator, notifier.clone())
        .await
        .unwrap();
    Harness {
        controller,
        notifier,
        output_dir,
    }
}

fn default_segments() -> Vec<Segment> {
    vec![Segment {
        text: "你好世界".to_string(),
        start_sec: 0.0,
        end_sec: Some(2.0),
    }]
}

async fn wait_for_complete(
    rx: &mut tokio::sync::broadcast::Receiver<Notification>,
) -> (String, usize) {
    timeout(Duration::from_secs(10), async {
        loop {
            match rx.recv().await.unwrap() {
                Notification::Complete {
                    filename,
                    segment_count,
                    ..
                } => return (filename, segment_count),
                Notification::Error { message } => panic!("transcription failed: {message}"),
                _ => {}
            }
        }
    })
    .await
    .expect("no completion notification")
}

#[tokio::test]
async fn test_start_is_single_flight() {
    let h = harness(Arc::new(MemoryStore::new()), default_segments()).await;
    h.controller.start("tab-1", "First", "").await.unwrap();
    let err = h.controller.start("tab-2", "Second", "").await.unwrap_err();
    assert!(matches!(err, Error::SessionState(_)));
    h.controller.stop().await.unwrap();
}

#[tokio::test]
async fn test_lifecycle_commands_reject_wrong_state() {
    let h = harness(Arc::new(MemoryStore::new()), default_segments()).await;

    assert!(matches!(
        h.controller.pause().await,
        Err(Error::SessionState(_))
    ));
    assert!(matches!(
        h.controller.resume().await,
        Err(Error::SessionState(_))
    ));
    assert!(matches!(
        h.controller.stop().await,
        Err(Error::SessionState(_))
    ));

    h.controller.start("tab-1", "Meeting", "").await.unwrap();
    // Resume without a pause is also a state error
    assert!(matches!(
        h.controller.resume().await,
        Err(Error::SessionState(_))
    ));
    h.controller.pause().await.unwrap();
    assert!(matches!(
        h.controller.pause().await,
        Err(Error::SessionState(_))
    ));
    h.controller.stop().await.unwrap();
}

#[tokio::test]
async fn test_pause_resume_keeps_elapsed_time_continuous() {
    let h = harness(Arc::new(MemoryStore::new()), default_segments()).await;

    h.controller.start("tab-1", "Meeting", "").await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    let paused_elapsed = h.controller.pause().await.unwrap();
    assert!(
        (100..1000).contains(&paused_elapsed),
        "elapsed at pause was {paused_elapsed} ms"
    );

    // Time spent paused must not count toward the recording
    tokio::time::sleep(Duration::from_millis(300)).await;
    let status = h.controller.status().await;
    assert!(status.paused);
    assert_eq!(status.paused_elapsed_ms, paused_elapsed);

    let new_start = h.controller.resume().await.unwrap();
    let now = chrono::Utc::now().timestamp_millis();
    let elapsed_after_resume = now - new_start;
    assert!(
        (elapsed_after_resume - paused_elapsed).abs() < 100,
        "elapsed jumped from {paused_elapsed} to {elapsed_after_resume} across resume"
    );

    h.controller.stop().await.unwrap();
}

#[tokio::test]
async fn test_session_survives_restart_via_store() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("session.json");
    let store = Arc::new(JsonFileStore::new(&path));

    let h = harness(store.clone(), default_segments()).await;
    h.controller
        .start("tab-42", "Durable", "https://example.com")
        .await
        .unwrap();
    assert!(path.exists());

    // A controller built over the same store sees the live session
    let h2 = harness(store.clone(), default_segments()).await;
    let status = h2.controller.status().await;
    assert!(status.recording);
    assert_eq!(status.target_id.as_deref(), Some("tab-42"));

    h.controller.stop().await.unwrap();
    assert!(!path.exists(), "stop must clear the persisted session");
}

#[tokio::test]
async fn test_stop_transcribes_and_delivers_markdown() {
    let h = harness(Arc::new(MemoryStore::new()), default_segments()).await;
    let mut rx = h.notifier.subscribe();

    h.controller
        .start("tab-1", "测试会议", "https://example.com/live")
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(30)).await;
    h.controller.stop().await.unwrap();

    let (filename, segment_count) = wait_for_complete(&mut rx).await;
    assert_eq!(filename, "测试会议.md");
    assert_eq!(segment_count, 1);

    let doc = std::fs::read_to_string(h.output_dir.path().join(&filename)).unwrap();
    assert!(doc.contains("## 完整文本"));
    assert!(doc.contains("你好世界"));
    assert!(doc.contains("**[00:00 - 00:02]** 你好世界"));
    assert!(doc.contains("source: \"https://example.com/live\""));

    // Session is idle again and can start a new recording
    let status = h.controller.status().await;
    assert!(!status.recording);
}

#[tokio::test]
async fn test_capture_loss_forces_stop() {
    // Tiny chunks at a fast cadence: the replay data runs out quickly and the
    // chunk stream closes without an explicit stop.
    let output_dir = TempDir::new().unwrap();
    let notifier = Notifier::default();
    let orchestrator = Arc::new(TranscriptionOrchestrator::new(
        None,
        common::stub_engine_cell(default_segments()),
        Arc::new(FileSink::new(output_dir.path())),
        notifier.clone(),
        OrchestratorConfig::default(),
    ));
    let capture = Arc::new(
        ReplayCapture::from_bytes(common::sample_wav())
            .with_cadence(Duration::from_millis(1))
            .with_chunk_bytes(16 * 1024),
    );
    let controller =
        SessionController::new(capture, Arc::new(MemoryStore::new()), orchestrator, notifier)
            .await
            .unwrap();

    controller.start("tab-1", "Vanishing", "").await.unwrap();

    timeout(Duration::from_secs(10), async {
        loop {
            if !controller.status().await.recording {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("session never settled after capture loss");
}
