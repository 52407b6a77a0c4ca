// Integration tests for the transcription pipeline

mod common;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tempfile::TempDir;
use tokio::time::timeout;

use common::StubEngine;
use tabscribe::transcribe::{
    EngineCell, InferenceOptions, LocalAsrEngine, OrchestratorConfig, RecordingMeta,
    TranscriptionOrchestrator,
};
use tabscribe::{Error, FileSink, Notification, Notifier, Result, Segment, SessionState};

fn meta() -> RecordingMeta {
    RecordingMeta {
        title: "流水线测试".to_string(),
        source_url: "https://example.com".to_string(),
        duration_sec: 1.0,
    }
}

fn orchestrator(
    engine: EngineCell,
    notifier: Notifier,
    sink_dir: &TempDir,
    keepalive: Duration,
) -> Arc<TranscriptionOrchestrator> {
    Arc::new(TranscriptionOrchestrator::new(
        None,
        engine,
        Arc::new(FileSink::new(sink_dir.path())),
        notifier,
        OrchestratorConfig {
            keepalive_interval: keepalive,
            ..OrchestratorConfig::default()
        },
    ))
}

#[tokio::test]
async fn test_keepalives_flow_while_transcribing() {
    let dir = TempDir::new().unwrap();
    let notifier = Notifier::default();
    let mut rx = notifier.subscribe();

    let engine = EngineCell::preloaded(Arc::new(StubEngine {
        segments: vec![Segment {
            text: "测试".to_string(),
            start_sec: 0.0,
            end_sec: Some(1.0),
        }],
        delay: Duration::from_millis(100),
    }));
    let orch = orchestrator(engine, notifier, &dir, Duration::from_millis(10));
    orch.run(common::sample_wav(), meta()).await;

    let mut keepalives = 0;
    let mut completed = false;
    // run() has returned, so everything is already buffered on the channel
    while let Ok(n) = rx.try_recv() {
        match n {
            Notification::KeepAlive => {
                assert!(!completed, "keepalive after completion");
                keepalives += 1;
            }
            Notification::Complete { .. } => completed = true,
            _ => {}
        }
    }
    assert!(completed);
    assert!(keepalives >= 2, "saw {keepalives} keepalives");
}

#[tokio::test]
async fn test_failure_notifies_error_then_idle() {
    struct FailingEngine;

    #[async_trait]
    impl LocalAsrEngine for FailingEngine {
        async fn transcribe(
            &self,
            _pcm: &[f32],
            _language_hint: &str,
            _options: &InferenceOptions,
        ) -> Result<Vec<Segment>> {
            Err(Error::Engine("model exploded".to_string()))
        }

        fn model_id(&self) -> &str {
            "failing"
        }
    }

    let dir = TempDir::new().unwrap();
    let notifier = Notifier::default();
    let mut rx = notifier.subscribe();

    let engine = EngineCell::preloaded(Arc::new(FailingEngine));
    let orch = orchestrator(engine, notifier, &dir, Duration::from_secs(25));
    orch.run(common::sample_wav(), meta()).await;

    let mut saw_error_message = false;
    let mut states = Vec::new();
    while let Ok(n) = rx.try_recv() {
        match n {
            Notification::Error { message } => {
                assert!(message.starts_with("转录失败:"), "{message}");
                assert!(message.contains("model exploded"));
                saw_error_message = true;
            }
            Notification::SessionStatus { state, .. } => states.push(state),
            _ => {}
        }
    }
    assert!(saw_error_message);
    assert_eq!(states, vec![SessionState::Error, SessionState::Idle]);
}

#[tokio::test]
async fn test_undecodable_audio_is_an_error_not_a_panic() {
    let dir = TempDir::new().unwrap();
    let notifier = Notifier::default();
    let mut rx = notifier.subscribe();

    let engine = common::stub_engine_cell(vec![]);
    let orch = orchestrator(engine, notifier, &dir, Duration::from_secs(25));
    orch.run(b"definitely not audio".to_vec(), meta()).await;

    let got_error = timeout(Duration::from_secs(5), async {
        loop {
            if let Notification::Error { .. } = rx.recv().await.unwrap() {
                return true;
            }
        }
    })
    .await
    .unwrap();
    assert!(got_error);
}

#[tokio::test]
async fn test_filtered_transcript_is_rendered() {
    let dir = TempDir::new().unwrap();
    let notifier = Notifier::default();
    let mut rx = notifier.subscribe();

    let engine = common::stub_engine_cell(vec![
        Segment {
            text: "正式内容第一段".to_string(),
            start_sec: 0.0,
            end_sec: Some(0.5),
        },
        Segment {
            text: "谢谢观看".to_string(),
            start_sec: 0.5,
            end_sec: Some(1.0),
        },
    ]);
    let orch = orchestrator(engine, notifier, &dir, Duration::from_secs(25));
    orch.run(common::sample_wav(), meta()).await;

    let (filename, segment_count) = loop {
        match rx.try_recv().unwrap() {
            Notification::Complete {
                filename,
                segment_count,
                ..
            } => break (filename, segment_count),
            _ => {}
        }
    };
    assert_eq!(segment_count, 1);
    let doc = std::fs::read_to_string(dir.path().join(filename)).unwrap();
    assert!(doc.contains("正式内容第一段"));
    assert!(!doc.contains("谢谢观看"));
}
