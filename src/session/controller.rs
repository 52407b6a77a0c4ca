use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use super::store::{SessionRecord, SessionStore};
use crate::audio::CaptureSource;
use crate::error::{Error, Result};
use crate::notify::{Notification, Notifier, SessionState};
use crate::transcribe::{RecordingMeta, TranscriptionOrchestrator};

/// Control command for the session state machine. Commands arrive from the
/// HTTP API (or any other front end) as a tagged union and are dispatched to
/// the matching handler.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum SessionCommand {
    Start {
        target_id: String,
        title: String,
        source_url: String,
    },
    Pause,
    Resume,
    Stop,
    Status,
}

/// Typed result of a dispatched command.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum CommandOutcome {
    Started,
    Paused { paused_elapsed_ms: i64 },
    Resumed { start_time_ms: i64 },
    Stopped,
    Status(SessionStatus),
}

/// Snapshot answered by `status()`.
#[derive(Debug, Clone, Serialize)]
pub struct SessionStatus {
    pub recording: bool,
    pub target_id: Option<String>,
    pub paused: bool,
    pub paused_elapsed_ms: i64,
    pub start_time_ms: Option<i64>,
}

struct Inner {
    session: Option<SessionRecord>,
    /// Audio accumulated from the capture stream for the active session.
    buffer: Option<Arc<Mutex<Vec<u8>>>>,
    capture_task: Option<JoinHandle<()>>,
    /// Set while an explicit stop is tearing the capture stream down, so the
    /// buffering task can tell a requested stop from a lost target.
    stopping: bool,
}

/// Top-level recording state machine.
///
/// Owns the single session record (`Idle -> Recording <-> Paused ->
/// Transcribing -> {Complete | Error} -> Idle`), mirrors every transition to
/// the durable store, and hands the finalized audio buffer to the
/// transcription orchestrator on stop. At most one session exists at any
/// time; a second `start` is rejected rather than queued.
#[derive(Clone)]
pub struct SessionController {
    capture: Arc<dyn CaptureSource>,
    store: Arc<dyn SessionStore>,
    orchestrator: Arc<TranscriptionOrchestrator>,
    notifier: Notifier,
    inner: Arc<Mutex<Inner>>,
}

impl SessionController {
    /// Build a controller, reloading any persisted session first so status
    /// queries are trustworthy immediately (the host may have restarted the
    /// process mid-recording).
    pub async fn new(
        capture: Arc<dyn CaptureSource>,
        store: Arc<dyn SessionStore>,
        orchestrator: Arc<TranscriptionOrchestrator>,
        notifier: Notifier,
    ) -> anyhow::Result<Self> {
        let restored = store.load().await?;
        if let Some(record) = &restored {
            warn!(
                "restored session for target {} (paused={})",
                record.target_id, record.paused
            );
        }
        Ok(Self {
            capture,
            store,
            orchestrator,
            notifier,
            inner: Arc::new(Mutex::new(Inner {
                session: restored,
                buffer: None,
                capture_task: None,
                stopping: false,
            })),
        })
    }

    /// Dispatch a control command to its handler.
    pub async fn dispatch(&self, command: SessionCommand) -> Result<CommandOutcome> {
        match command {
            SessionCommand::Start {
                target_id,
                title,
                source_url,
            } => {
                self.start(&target_id, &title, &source_url).await?;
                Ok(CommandOutcome::Started)
            }
            SessionCommand::Pause => {
                let paused_elapsed_ms = self.pause().await?;
                Ok(CommandOutcome::Paused { paused_elapsed_ms })
            }
            SessionCommand::Resume => {
                let start_time_ms = self.resume().await?;
                Ok(CommandOutcome::Resumed { start_time_ms })
            }
            SessionCommand::Stop => {
                self.stop().await?;
                Ok(CommandOutcome::Stopped)
            }
            SessionCommand::Status => Ok(CommandOutcome::Status(self.status().await)),
        }
    }

    /// Acquire the capture source and open a new session. Fails with a
    /// `SessionState` error while another session is active.
    pub async fn start(&self, target_id: &str, title: &str, source_url: &str) -> Result<()> {
        let mut inner = self.inner.lock().await;
        if inner.session.is_some() {
            return Err(Error::SessionState(
                "a recording session is already active".into(),
            ));
        }

        let mut chunk_rx = self.capture.start(target_id).await?;

        let record = SessionRecord {
            target_id: target_id.to_string(),
            title: title.to_string(),
            source_url: source_url.to_string(),
            start_time_ms: Utc::now().timestamp_millis(),
            paused: false,
            paused_elapsed_ms: 0,
            status_target: target_id.to_string(),
        };

        if let Err(e) = self.store.save(&record).await {
            // Don't leave the capture source running for a session that was
            // never persisted.
            if let Err(stop_err) = self.capture.stop().await {
                warn!("capture stop after failed persist also failed: {stop_err}");
            }
            return Err(Error::Store(e.to_string()));
        }

        let buffer = Arc::new(Mutex::new(Vec::new()));
        let controller = self.clone();
        let task_buffer = Arc::clone(&buffer);
        let capture_task = tokio::spawn(async move {
            while let Some(chunk) = chunk_rx.recv().await {
                task_buffer.lock().await.extend_from_slice(&chunk);
            }
            // Chunk stream closed. If no stop was requested the capture
            // target went away externally; force a stop so the session does
            // not dangle.
            let lost = {
                let inner = controller.inner.lock().await;
                inner.session.is_some() && !inner.stopping
            };
            if lost {
                warn!("capture target lost, forcing stop");
                tokio::spawn(async move {
                    if let Err(e) = controller.stop().await {
                        error!("forced stop after capture loss failed: {e}");
                    }
                });
            }
        });

        inner.buffer = Some(buffer);
        inner.capture_task = Some(capture_task);
        inner.session = Some(record.clone());
        drop(inner);

        info!(
            "recording started for target {} via {} capture",
            target_id,
            self.capture.name()
        );
        self.notify_session(SessionState::Recording, &record);
        Ok(())
    }

    /// Pause the active session, capturing the elapsed time at the pause
    /// moment. Returns the captured elapsed milliseconds.
    pub async fn pause(&self) -> Result<i64> {
        let mut inner = self.inner.lock().await;
        let record = inner
            .session
            .as_mut()
            .ok_or_else(|| Error::SessionState("no active recording session".into()))?;
        if record.paused {
            return Err(Error::SessionState("recording is already paused".into()));
        }

        self.capture.pause().await?;

        record.paused_elapsed_ms = Utc::now().timestamp_millis() - record.start_time_ms;
        record.paused = true;
        self.store
            .save(record)
            .await
            .map_err(|e| Error::Store(e.to_string()))?;

        let snapshot = record.clone();
        drop(inner);

        info!(
            "recording paused at {} ms elapsed",
            snapshot.paused_elapsed_ms
        );
        self.notify_session(SessionState::Paused, &snapshot);
        Ok(snapshot.paused_elapsed_ms)
    }

    /// Resume a paused session. The start timestamp is rewound by the paused
    /// elapsed time so `now - start_time_ms` stays continuous across the
    /// pause. Returns the new virtual start timestamp.
    pub async fn resume(&self) -> Result<i64> {
        let mut inner = self.inner.lock().await;
        let record = inner
            .session
            .as_mut()
            .ok_or_else(|| Error::SessionState("no active recording session".into()))?;
        if !record.paused {
            return Err(Error::SessionState("recording is not paused".into()));
        }

        self.capture.resume().await?;

        record.start_time_ms = Utc::now().timestamp_millis() - record.paused_elapsed_ms;
        record.paused = false;
        record.paused_elapsed_ms = 0;
        self.store
            .save(record)
            .await
            .map_err(|e| Error::Store(e.to_string()))?;

        let snapshot = record.clone();
        drop(inner);

        info!("recording resumed");
        self.notify_session(SessionState::Recording, &snapshot);
        Ok(snapshot.start_time_ms)
    }

    /// Finalize the capture stream, clear the session, and hand the buffered
    /// audio to the transcription orchestrator. Transcription continues in
    /// the background; its outcome arrives on the notification channel.
    pub async fn stop(&self) -> Result<()> {
        let (record, buffer, capture_task) = {
            let mut inner = self.inner.lock().await;
            let record = inner
                .session
                .take()
                .ok_or_else(|| Error::SessionState("no active recording session".into()))?;
            inner.stopping = true;
            (record, inner.buffer.take(), inner.capture_task.take())
        };

        // Flush and finalize. Best-effort: the target may already be gone.
        if let Err(e) = self.capture.stop().await {
            warn!("capture stop failed: {e}");
        }
        if let Some(task) = capture_task {
            if let Err(e) = task.await {
                error!("capture buffering task panicked: {e}");
            }
        }
        self.inner.lock().await.stopping = false;

        self.store
            .clear()
            .await
            .map_err(|e| Error::Store(e.to_string()))?;

        let audio = match buffer {
            Some(buffer) => std::mem::take(&mut *buffer.lock().await),
            None => Vec::new(),
        };

        let elapsed_ms = if record.paused {
            record.paused_elapsed_ms
        } else {
            Utc::now().timestamp_millis() - record.start_time_ms
        };
        let duration_sec = elapsed_ms as f64 / 1000.0;

        info!(
            "recording stopped for target {} ({} bytes, {:.1}s)",
            record.target_id,
            audio.len(),
            duration_sec
        );
        self.notify_session(SessionState::Transcribing, &record);

        let orchestrator = Arc::clone(&self.orchestrator);
        let meta = RecordingMeta {
            title: record.title,
            source_url: record.source_url,
            duration_sec,
        };
        tokio::spawn(async move {
            orchestrator.run(audio, meta).await;
        });

        Ok(())
    }

    /// Current session snapshot. Persisted state is reloaded during
    /// construction, so this is accurate even right after a restart.
    pub async fn status(&self) -> SessionStatus {
        let inner = self.inner.lock().await;
        match &inner.session {
            Some(record) => SessionStatus {
                recording: true,
                target_id: Some(record.target_id.clone()),
                paused: record.paused,
                paused_elapsed_ms: record.paused_elapsed_ms,
                start_time_ms: Some(record.start_time_ms),
            },
            None => SessionStatus {
                recording: false,
                target_id: None,
                paused: false,
                paused_elapsed_ms: 0,
                start_time_ms: None,
            },
        }
    }

    fn notify_session(&self, state: SessionState, record: &SessionRecord) {
        self.notifier.send(Notification::SessionStatus {
            state,
            status_target: Some(record.status_target.clone()),
            start_time_ms: Some(record.start_time_ms),
            paused_elapsed_ms: Some(record.paused_elapsed_ms),
        });
    }
}
