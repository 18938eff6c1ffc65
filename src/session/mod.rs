//! Recording/playback session lifecycle.
//!
//! One coordinator per user-facing session arbitrates the microphone, the
//! streaming recognizer, and memo playback, publishing an observable
//! `SessionState` for the UI layer.

pub mod coordinator;
pub mod error;
pub mod status;

pub use coordinator::SessionCoordinator;
pub use error::{
    AudioSessionError, PermissionError, PlaybackError, SessionError, TranscriptionError,
};
pub use status::{MemoId, SessionMode, SessionState, SessionStatusHandle};
