//! Memo endpoints.
//!
//! Provides HTTP endpoints for:
//! - Listing/searching memos (GET /memos)
//! - Getting one memo (GET /memos/:id)
//! - Saving a memo (POST /memos)
//! - Deleting a memo (DELETE /memos/:id)
//! - Playing a memo back (POST /memos/:id/play)

use axum::{
    extract::{Path, Query, State},
    response::Json,
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use crate::api::error::{ApiError, ApiResult};
use crate::memos::{self, NewMemo};
use crate::playback::PlaybackSource;
use crate::session::SessionCoordinator;

#[derive(Clone)]
pub struct MemosApiState {
    pub coordinator: Arc<SessionCoordinator>,
    pub default_color: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub query: Option<String>,
    pub limit: Option<usize>,
}

/// Request body for saving a memo. With no `text`, the session's retained
/// transcript (and its recording, if captured) becomes the memo.
#[derive(Debug, Default, Deserialize)]
pub struct SaveMemoRequest {
    pub text: Option<String>,
    pub color: Option<String>,
}

pub fn router(state: MemosApiState) -> Router {
    Router::new()
        .route("/memos", get(list_memos).post(save_memo))
        .route("/memos/:id", get(get_memo).delete(delete_memo))
        .route("/memos/:id/play", post(play_memo))
        .with_state(state)
}

async fn list_memos(
    Query(params): Query<ListParams>,
    State(_state): State<MemosApiState>,
) -> ApiResult<Json<Value>> {
    let limit = params.limit.unwrap_or(50);
    let entries = memos::list(params.query.as_deref(), limit)?;

    Ok(Json(json!({
        "count": entries.len(),
        "memos": entries,
    })))
}

async fn get_memo(
    Path(id): Path<String>,
    State(_state): State<MemosApiState>,
) -> ApiResult<Json<Value>> {
    let entry = memos::get(&id)?
        .ok_or_else(|| ApiError::not_found(format!("Memo {} not found", id)))?;

    Ok(Json(serde_json::to_value(entry).map_err(|e| ApiError::internal(e.to_string()))?))
}

async fn save_memo(
    State(state): State<MemosApiState>,
    body: Option<Json<SaveMemoRequest>>,
) -> ApiResult<Json<Value>> {
    let request = body.map(|Json(req)| req).unwrap_or_default();

    // Typed text wins; otherwise consume the finished transcript along with
    // the recording captured for it.
    let (text, audio_path) = match request.text {
        Some(text) => (text, None),
        None => {
            let transcript = state.coordinator.take_transcript().await.ok_or_else(|| {
                ApiError::bad_request("No text given and no finished transcript to save")
            })?;
            let audio_path = state
                .coordinator
                .take_recording()
                .await
                .map(|p| p.to_string_lossy().to_string());
            (transcript, audio_path)
        }
    };

    let memo = NewMemo {
        text,
        audio_path,
        color: request.color.unwrap_or_else(|| state.default_color.clone()),
    };
    let id = memos::save(&memo).map_err(|e| ApiError::bad_request(e.to_string()))?;

    info!("Memo {} saved", id);
    Ok(Json(json!({
        "success": true,
        "id": id,
    })))
}

async fn delete_memo(
    Path(id): Path<String>,
    State(state): State<MemosApiState>,
) -> ApiResult<Json<Value>> {
    // Never delete the memo that is currently sounding out from under the
    // player; stop it first.
    let session = state.coordinator.status().get().await;
    if session.active_memo_id.as_deref() == Some(id.as_str()) {
        state.coordinator.stop_playback().await;
    }

    memos::delete(&id).map_err(|e| ApiError::not_found(e.to_string()))?;

    info!("Memo {} deleted", id);
    Ok(Json(json!({ "success": true })))
}

/// Plays a memo: its recorded audio when it has one, spoken text otherwise.
/// Playing the memo that is already sounding stops it (toggle). Returns 409
/// while a recording is running.
async fn play_memo(
    Path(id): Path<String>,
    State(state): State<MemosApiState>,
) -> ApiResult<Json<Value>> {
    let entry = memos::get(&id)?
        .ok_or_else(|| ApiError::not_found(format!("Memo {} not found", id)))?;

    let source = match entry.audio_path {
        Some(path) => PlaybackSource::AudioFile(PathBuf::from(path)),
        None => PlaybackSource::Text(entry.text),
    };

    state.coordinator.play(source, id.clone()).await?;

    let session = state.coordinator.status().get().await;
    Ok(Json(json!({
        "success": true,
        "mode": session.mode.as_str(),
        "active_memo_id": session.active_memo_id,
    })))
}
