//! Error taxonomy for the recording/playback session.
//!
//! Every variant here is recoverable at the coordinator boundary: it is
//! captured into `SessionState.last_error` and the machine falls back to
//! idle. Nothing is fatal to the process.

use std::path::PathBuf;
use thiserror::Error;

/// The platform refused an audio-session mode change.
#[derive(Debug, Clone, Error)]
pub enum AudioSessionError {
    #[error("audio session activation refused: {0}")]
    ActivationRefused(String),

    #[error("no {0} device available")]
    DeviceUnavailable(&'static str),
}

#[derive(Debug, Clone, Error)]
pub enum TranscriptionError {
    #[error("microphone or speech recognition permission not granted")]
    PermissionDenied,

    #[error("speech recognizer unavailable: {0}")]
    RecognizerUnavailable(String),

    #[error("audio engine failed to start: {0}")]
    EngineStart(String),

    #[error("recognition failed: {0}")]
    Recognition(String),
}

#[derive(Debug, Clone, Error)]
pub enum PlaybackError {
    #[error("audio file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("failed to play audio file: {0}")]
    Decode(String),

    #[error("speech synthesis failed: {0}")]
    Synthesis(String),
}

#[derive(Debug, Clone, Error)]
pub enum PermissionError {
    #[error("microphone or speech recognition permission not granted")]
    Denied,
}

/// Errors surfaced by the coordinator's public entry points.
#[derive(Debug, Clone, Error)]
pub enum SessionError {
    /// Playback was requested mid-recording. The recording keeps running;
    /// callers must stop it first so a partial transcript is never lost.
    #[error("recording in progress; stop recording before playback")]
    RecordingInProgress,

    #[error(transparent)]
    AudioSession(#[from] AudioSessionError),

    #[error(transparent)]
    Transcription(#[from] TranscriptionError),

    #[error(transparent)]
    Playback(#[from] PlaybackError),

    #[error(transparent)]
    Permission(#[from] PermissionError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_error_is_transparent_over_components() {
        let err: SessionError = TranscriptionError::PermissionDenied.into();
        assert_eq!(
            err.to_string(),
            "microphone or speech recognition permission not granted"
        );

        let err: SessionError = PlaybackError::FileNotFound(PathBuf::from("/tmp/a.wav")).into();
        assert!(err.to_string().contains("/tmp/a.wav"));
    }
}
