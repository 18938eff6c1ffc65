//! Recording/session control endpoints.
//!
//! Provides HTTP endpoints for:
//! - Starting a recording (POST /record/start)
//! - Stopping a recording (POST /record/stop)
//! - Stopping playback (POST /playback/stop)
//! - Observing the session (GET /status)

use axum::{
    extract::State,
    response::Json,
    routing::{get, post},
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::info;

use crate::api::error::ApiResult;
use crate::session::{SessionCoordinator, SessionState};

#[derive(Clone)]
pub struct SessionApiState {
    pub coordinator: Arc<SessionCoordinator>,
}

pub fn router(state: SessionApiState) -> Router {
    Router::new()
        .route("/record/start", post(start_recording))
        .route("/record/stop", post(stop_recording))
        .route("/playback/stop", post(stop_playback))
        .route("/status", get(session_status))
        .with_state(state)
}

fn state_json(state: &SessionState) -> Value {
    json!({
        "mode": state.mode.as_str(),
        "transcript": state.transcript,
        "active_memo_id": state.active_memo_id,
        "last_recording": state
            .last_recording
            .as_ref()
            .map(|p| p.to_string_lossy().to_string()),
        "duration_seconds": state.duration_seconds(),
        "last_error": state.last_error,
    })
}

/// Starts microphone capture and streaming recognition.
async fn start_recording(State(state): State<SessionApiState>) -> ApiResult<Json<Value>> {
    info!("Record start requested via API");
    state.coordinator.start_recording().await?;

    let session = state.coordinator.status().get().await;
    Ok(Json(json!({
        "success": true,
        "mode": session.mode.as_str(),
    })))
}

/// Stops recognition; the transcript snapshot stays available until a memo
/// is saved from it. A no-op when nothing is recording.
async fn stop_recording(State(state): State<SessionApiState>) -> ApiResult<Json<Value>> {
    info!("Record stop requested via API");
    state.coordinator.stop_recording().await?;

    let session = state.coordinator.status().get().await;
    Ok(Json(json!({
        "success": true,
        "mode": session.mode.as_str(),
        "transcript": session.transcript,
        "last_recording": session
            .last_recording
            .as_ref()
            .map(|p| p.to_string_lossy().to_string()),
    })))
}

/// Stops whatever memo is sounding. A no-op when nothing is.
async fn stop_playback(State(state): State<SessionApiState>) -> Json<Value> {
    info!("Playback stop requested via API");
    state.coordinator.stop_playback().await;

    Json(json!({ "success": true }))
}

/// Current session state: mode, live transcript, active memo, last error.
async fn session_status(State(state): State<SessionApiState>) -> Json<Value> {
    let session = state.coordinator.status().get().await;
    Json(state_json(&session))
}
