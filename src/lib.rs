pub mod artifact;
pub mod audio;
pub mod config;
pub mod error;
pub mod http;
pub mod notify;
pub mod session;
pub mod text;
pub mod transcribe;

pub use artifact::{DeliverySink, FileSink, TranscriptArtifact};
pub use audio::{CaptureSource, ReplayCapture};
pub use config::Config;
pub use error::{Error, Result};
pub use http::{create_router, AppState};
pub use notify::{Notification, Notifier, SessionState};
pub use session::{
    CommandOutcome, JsonFileStore, SessionCommand, SessionController, SessionRecord, SessionStore,
};
pub use transcribe::{
    CloudAsrClient, CloudConfig, EngineCell, LocalAsrEngine, OrchestratorConfig, RecordingMeta,
    Segment, TranscriptionOrchestrator,
};
