//! Recording session management
//!
//! This module provides the session state machine:
//! - Lifecycle control (start/pause/resume/stop) with time reconciliation
//!   across pause cycles
//! - Durable persistence of the single session record across restarts
//! - Audio buffering from the capture source
//! - Handoff of finalized audio to the transcription orchestrator

mod controller;
mod store;

pub use controller::{CommandOutcome, SessionCommand, SessionController, SessionStatus};
pub use store::{JsonFileStore, MemoryStore, SessionRecord, SessionStore};
