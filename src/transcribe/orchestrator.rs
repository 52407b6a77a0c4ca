//! Pipeline that turns a finished recording into a delivered transcript.
//!
//! The orchestrator owns everything after capture stops: decode and resample
//! the raw audio, transcribe it through the cloud client or the local engine,
//! clean the text, render the Markdown document, and hand it to the delivery
//! sink. It runs detached from the session controller and reports progress
//! over the notifier.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{error, info, warn};

use crate::artifact::{sanitize_filename, DeliverySink, TranscriptArtifact};
use crate::audio::{decode_and_resample, encode_wav, TARGET_SAMPLE_RATE};
use crate::error::{Error, Result};
use crate::notify::{Notification, Notifier, SessionState};
use crate::text;
use crate::transcribe::{CloudAsrClient, EngineCell, InferenceOptions, RecordingMeta};

#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    pub language: String,
    pub keepalive_interval: Duration,
    pub inference: InferenceOptions,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            language: "zh".to_string(),
            keepalive_interval: Duration::from_secs(25),
            inference: InferenceOptions::default(),
        }
    }
}

/// Monotonic progress publisher. Stages report their own percentages and the
/// reporter drops anything that would move the bar backwards.
#[derive(Clone)]
pub struct ProgressReporter {
    notifier: Notifier,
    last: Arc<AtomicU8>,
}

impl ProgressReporter {
    pub fn new(notifier: Notifier) -> Self {
        Self {
            notifier,
            last: Arc::new(AtomicU8::new(0)),
        }
    }

    pub fn report(&self, percent: u8, status: impl Into<String>) {
        let prev = self.last.fetch_max(percent, Ordering::SeqCst);
        let percent = percent.max(prev);
        self.notifier.send(Notification::Progress {
            percent,
            status: status.into(),
        });
    }
}

/// End-to-end transcription pipeline.
pub struct TranscriptionOrchestrator {
    cloud: Option<CloudAsrClient>,
    engine: EngineCell,
    sink: Arc<dyn DeliverySink>,
    notifier: Notifier,
    config: OrchestratorConfig,
}

impl TranscriptionOrchestrator {
    pub fn new(
        cloud: Option<CloudAsrClient>,
        engine: EngineCell,
        sink: Arc<dyn DeliverySink>,
        notifier: Notifier,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            cloud,
            engine,
            sink,
            notifier,
            config,
        }
    }

    /// Run the pipeline to completion. Failures are reported over the
    /// notifier rather than returned; the session always settles back to
    /// idle.
    pub async fn run(self: Arc<Self>, audio: Vec<u8>, meta: RecordingMeta) {
        let keepalive = self.spawn_keepalive();
        let outcome = self.execute(audio, &meta).await;
        keepalive.abort();

        match outcome {
            Ok((filename, segment_count)) => {
                info!(%filename, segment_count, "transcript delivered");
                self.notifier.send(Notification::Complete {
                    filename,
                    segment_count,
                    duration_sec: meta.duration_sec,
                });
                self.notify_state(SessionState::Complete);
            }
            Err(e) => {
                error!(error = %e, "transcription failed");
                self.notifier.send(Notification::Error {
                    message: format!("转录失败: {e}"),
                });
                self.notify_state(SessionState::Error);
            }
        }
        self.notify_state(SessionState::Idle);
    }

    async fn execute(&self, audio: Vec<u8>, meta: &RecordingMeta) -> Result<(String, usize)> {
        let reporter = ProgressReporter::new(self.notifier.clone());
        reporter.report(5, "正在处理音频...");
        let pcm = decode_and_resample(audio).map_err(|e| Error::Audio(e.to_string()))?;

        let (segments, model) = match &self.cloud {
            Some(cloud) => {
                reporter.report(10, "正在上传音频到云端...");
                let wav = encode_wav(&pcm, TARGET_SAMPLE_RATE)
                    .map_err(|e| Error::Audio(e.to_string()))?;
                let r = reporter.clone();
                let segments = cloud
                    .transcribe(wav, meta.duration_sec, move |percent, status| {
                        r.report(percent, status)
                    })
                    .await?;
                (segments, cloud.model().to_string())
            }
            None => {
                let engine = self.engine.get().await?;
                reporter.report(20, "正在转录...");
                let estimator = self.spawn_progress_estimator(&reporter, meta.duration_sec);
                let result = engine
                    .transcribe(&pcm, &self.config.language, &self.config.inference)
                    .await;
                estimator.abort();
                (result?, engine.model_id().to_string())
            }
        };

        reporter.report(90, "正在生成文件...");
        let segments: Vec<_> = segments
            .into_iter()
            .map(|mut s| {
                s.text = text::to_simplified(&s.text);
                s
            })
            .collect();
        let kept = text::filter_segments(segments);

        let artifact = TranscriptArtifact {
            title: meta.title.clone(),
            source_url: meta.source_url.clone(),
            duration_sec: meta.duration_sec,
            language: self.config.language.clone(),
            model,
            generated_at: Utc::now(),
            segments: kept,
        };
        let document = artifact.render();
        let filename = format!("{}.md", sanitize_filename(&artifact.title));
        self.sink
            .deliver(&filename, document.as_bytes())
            .await
            .map_err(|e| Error::Store(format!("{e:#}")))?;

        reporter.report(100, "完成");
        Ok((filename, artifact.segments.len()))
    }

    /// Periodic heartbeat so listeners can tell a long-running transcription
    /// from a dead pipeline.
    fn spawn_keepalive(&self) -> tokio::task::JoinHandle<()> {
        let notifier = self.notifier.clone();
        let interval = self.config.keepalive_interval;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await; // first tick fires immediately
            loop {
                ticker.tick().await;
                notifier.send(Notification::KeepAlive);
            }
        })
    }

    /// The local engine gives no progress callbacks, so estimate from elapsed
    /// wall time against a guessed processing duration.
    fn spawn_progress_estimator(
        &self,
        reporter: &ProgressReporter,
        duration_sec: f64,
    ) -> tokio::task::JoinHandle<()> {
        let reporter = reporter.clone();
        let estimated = (duration_sec * 0.5).max(10.0);
        tokio::spawn(async move {
            let started = tokio::time::Instant::now();
            let mut ticker = tokio::time::interval(Duration::from_secs(2));
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let ratio = (started.elapsed().as_secs_f64() / estimated).min(0.95);
                let percent = (20.0 + ratio * 70.0) as u8;
                reporter.report(percent, format!("正在转录 ({:.0}%)...", ratio * 100.0));
            }
        })
    }

    fn notify_state(&self, state: SessionState) {
        self.notifier.send(Notification::SessionStatus {
            state,
            status_target: None,
            start_time_ms: None,
            paused_elapsed_ms: None,
        });
        if matches!(state, SessionState::Error) {
            warn!("session settled in error state");
        }
    }
}
