use super::state::AppState;
use crate::error::Error;
use crate::session::SessionCommand;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct StartSessionRequest {
    /// Identifier of the source being recorded
    pub target_id: String,

    /// Human-readable title for the transcript
    pub title: String,

    /// URL of the recorded source, recorded in transcript metadata
    #[serde(default)]
    pub source_url: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /session/start
pub async fn start_session(
    State(state): State<AppState>,
    Json(req): Json<StartSessionRequest>,
) -> impl IntoResponse {
    info!(target_id = %req.target_id, "starting recording session");
    dispatch(
        &state,
        SessionCommand::Start {
            target_id: req.target_id,
            title: req.title,
            source_url: req.source_url,
        },
    )
    .await
}

/// POST /session/pause
pub async fn pause_session(State(state): State<AppState>) -> impl IntoResponse {
    dispatch(&state, SessionCommand::Pause).await
}

/// POST /session/resume
pub async fn resume_session(State(state): State<AppState>) -> impl IntoResponse {
    dispatch(&state, SessionCommand::Resume).await
}

/// POST /session/stop
pub async fn stop_session(State(state): State<AppState>) -> impl IntoResponse {
    dispatch(&state, SessionCommand::Stop).await
}

/// GET /session/status
pub async fn session_status(State(state): State<AppState>) -> impl IntoResponse {
    dispatch(&state, SessionCommand::Status).await
}

/// GET /health
pub async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "tabscribe",
    }))
}

async fn dispatch(state: &AppState, command: SessionCommand) -> axum::response::Response {
    match state.controller.dispatch(command).await {
        Ok(outcome) => (StatusCode::OK, Json(outcome)).into_response(),
        Err(e) => {
            let status = match &e {
                Error::SessionState(_) => StatusCode::CONFLICT,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            };
            error!(error = %e, "session command failed");
            (
                status,
                Json(ErrorResponse {
                    error: e.to_string(),
                }),
            )
                .into_response()
        }
    }
}
