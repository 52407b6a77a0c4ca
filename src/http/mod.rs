//! HTTP API server for external control
//!
//! This module provides a REST API for driving the recording session:
//! - POST /session/start - Start recording
//! - POST /session/pause - Pause the active recording
//! - POST /session/resume - Resume a paused recording
//! - POST /session/stop - Stop and transcribe
//! - GET /session/status - Query session status
//! - GET /health - Health check

mod handlers;
mod routes;
mod state;

pub use routes::create_router;
pub use state::AppState;
