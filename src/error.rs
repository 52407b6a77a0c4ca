use thiserror::Error;

/// Error kinds for the recording/transcription pipeline.
///
/// Session and capture errors surface synchronously to the caller of the
/// triggering operation; transcription-path errors surface asynchronously via
/// the error notification and a terminal `Error` session state.
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid session transition: start-while-active, pause-while-idle or
    /// already paused, resume-while-not-paused, stop-while-idle.
    #[error("{0}")]
    SessionState(String),

    /// Capture source unavailable or permission denied.
    #[error("capture error: {0}")]
    Capture(String),

    /// A remote-protocol step failed at the transport level, tagged with the
    /// step it belongs to.
    #[error("network error during {step}: {message}")]
    Network {
        step: &'static str,
        message: String,
    },

    /// Malformed or unexpected response payload (bad JSON, missing required
    /// fields such as the task id or result location).
    #[error("protocol error: {0}")]
    Protocol(String),

    /// The remote job reported a terminal failure status.
    #[error("transcription task failed ({code}): {message}")]
    Task { code: String, message: String },

    /// Poll attempts exhausted, or too many consecutive empty-status polls.
    #[error("timeout: {0}")]
    Timeout(String),

    /// Local model load or inference failure.
    #[error("engine error: {0}")]
    Engine(String),

    /// Audio decode or encode failure.
    #[error("audio error: {0}")]
    Audio(String),

    /// Session store or delivery sink failure.
    #[error("storage error: {0}")]
    Store(String),
}

impl Error {
    /// Tag a transport-level failure with the protocol step it belongs to.
    pub fn network(step: &'static str, err: reqwest::Error) -> Self {
        Error::Network {
            step,
            message: err.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
