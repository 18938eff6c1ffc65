//! Session state types and the shared status handle.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Identifier of a persisted memo (uuid string).
pub type MemoId = String;

/// What the session is currently doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionMode {
    Idle,
    Recording,
    Playing,
}

impl SessionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Recording => "recording",
            Self::Playing => "playing",
        }
    }
}

/// Observable session state, published by the coordinator and read by the
/// API layer. `active_memo_id` is set only while `mode == Playing`; the
/// transcript is a retained snapshot once recording stops, until a caller
/// consumes it.
#[derive(Debug, Clone)]
pub struct SessionState {
    pub mode: SessionMode,
    pub transcript: String,
    pub active_memo_id: Option<MemoId>,
    /// WAV written by the most recent recording, when audio capture is on.
    pub last_recording: Option<PathBuf>,
    pub started_at: Option<chrono::DateTime<chrono::Utc>>,
    pub last_error: Option<String>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            mode: SessionMode::Idle,
            transcript: String::new(),
            active_memo_id: None,
            last_recording: None,
            started_at: None,
            last_error: None,
        }
    }
}

impl SessionState {
    /// Seconds since recording started.
    pub fn duration_seconds(&self) -> Option<u64> {
        self.started_at.map(|started| {
            let elapsed = chrono::Utc::now() - started;
            elapsed.num_seconds().max(0) as u64
        })
    }
}

/// Thread-safe handle for sharing session state between the coordinator and
/// API handlers. All mutation happens through the coordinator while it holds
/// its transition lock.
#[derive(Clone, Default)]
pub struct SessionStatusHandle {
    inner: Arc<Mutex<SessionState>>,
}

impl SessionStatusHandle {
    pub async fn get(&self) -> SessionState {
        self.inner.lock().await.clone()
    }

    /// Enter Recording: transcript and previous error are cleared.
    pub async fn begin_recording(&self) {
        let mut state = self.inner.lock().await;
        state.mode = SessionMode::Recording;
        state.transcript.clear();
        state.active_memo_id = None;
        state.last_recording = None;
        state.started_at = Some(chrono::Utc::now());
        state.last_error = None;
    }

    /// Replace the live transcript with a more complete recognition result.
    pub async fn set_transcript(&self, text: String) {
        let mut state = self.inner.lock().await;
        if state.mode == SessionMode::Recording {
            state.transcript = text;
        }
    }

    /// Leave Recording. The transcript snapshot is retained for the caller.
    pub async fn finish_recording(&self, recording: Option<PathBuf>, error: Option<String>) {
        let mut state = self.inner.lock().await;
        state.mode = SessionMode::Idle;
        state.started_at = None;
        state.last_recording = recording;
        state.last_error = error;
    }

    pub async fn begin_playback(&self, memo_id: MemoId) {
        let mut state = self.inner.lock().await;
        state.mode = SessionMode::Playing;
        state.active_memo_id = Some(memo_id);
        state.last_error = None;
    }

    pub async fn finish_playback(&self, error: Option<String>) {
        let mut state = self.inner.lock().await;
        state.mode = SessionMode::Idle;
        state.active_memo_id = None;
        state.last_error = error;
    }

    /// Record a failure that left (or returned) the session to idle.
    pub async fn record_failure(&self, error: String) {
        let mut state = self.inner.lock().await;
        state.mode = SessionMode::Idle;
        state.active_memo_id = None;
        state.started_at = None;
        state.last_error = Some(error);
    }

    /// Hand the retained transcript to the caller, clearing it.
    pub async fn take_transcript(&self) -> Option<String> {
        let mut state = self.inner.lock().await;
        if state.mode == SessionMode::Recording || state.transcript.is_empty() {
            return None;
        }
        Some(std::mem::take(&mut state.transcript))
    }

    /// Consume the path of the last captured recording.
    pub async fn take_recording(&self) -> Option<PathBuf> {
        let mut state = self.inner.lock().await;
        state.last_recording.take()
    }

    pub async fn reset(&self) {
        let mut state = self.inner.lock().await;
        *state = SessionState::default();
    }
}
