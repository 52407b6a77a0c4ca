//! Transcription backends and the pipeline that drives them.

pub mod cloud;
pub mod local;
pub mod orchestrator;
pub mod poll;

use serde::{Deserialize, Serialize};

pub use cloud::{CloudAsrClient, CloudConfig};
pub use local::{EngineCell, EngineLoader, InferenceOptions, LocalAsrEngine};
pub use orchestrator::{OrchestratorConfig, TranscriptionOrchestrator};
pub use poll::{PollPolicy, PollStep};

/// One timestamped span of recognized speech.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub text: String,
    pub start_sec: f64,
    /// Missing when the backend could not bound the span; rendering falls
    /// back to the recording duration.
    pub end_sec: Option<f64>,
}

/// Metadata about a finished recording, carried from capture to delivery.
#[derive(Debug, Clone)]
pub struct RecordingMeta {
    pub title: String,
    pub source_url: String,
    pub duration_sec: f64,
}
