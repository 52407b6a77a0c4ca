use serde::{Deserialize, Serialize};

/// Lifecycle state reported in session-status notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Idle,
    Recording,
    Paused,
    Transcribing,
    Complete,
    Error,
}

/// Typed messages published on the notification channel.
///
/// Delivery is best-effort: no subscriber is a valid, non-error outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Notification {
    /// Session lifecycle transition, with enough data to reconstruct the new
    /// state remotely.
    SessionStatus {
        state: SessionState,
        /// Identifier status updates for this session are routed to.
        status_target: Option<String>,
        start_time_ms: Option<i64>,
        paused_elapsed_ms: Option<i64>,
    },

    /// Transcription progress, monotonically non-decreasing per job.
    Progress { percent: u8, status: String },

    /// Transcription finished and the artifact was delivered.
    Complete {
        filename: String,
        segment_count: usize,
        duration_sec: f64,
    },

    /// Unrecoverable transcription failure.
    Error { message: String },

    /// Emitted on a fixed interval while a job is outstanding, so the hosting
    /// environment does not reclaim the worker.
    KeepAlive,
}
