//! Microphone/recognition permission gate.
//!
//! Checked before recording starts; a denial surfaces as a recoverable
//! error the UI turns into a "grant access" prompt, never a crash.

use async_trait::async_trait;
use cpal::traits::HostTrait;
use tracing::warn;

/// Combined microphone + speech recognition permission request.
#[async_trait]
pub trait PermissionGate: Send + Sync {
    async fn request(&self) -> bool;
}

/// Host-level gate: capture is possible when a default input device exists,
/// and recognition when the recognizer binary resolves. There is no runtime
/// consent dialog to drive on this platform, so capability stands in for
/// consent.
pub struct SystemPermissionGate {
    recognizer_command: String,
}

impl SystemPermissionGate {
    pub fn new(recognizer_command: impl Into<String>) -> Self {
        Self {
            recognizer_command: recognizer_command.into(),
        }
    }
}

#[async_trait]
impl PermissionGate for SystemPermissionGate {
    async fn request(&self) -> bool {
        let host = cpal::default_host();
        if host.default_input_device().is_none() {
            warn!("Microphone access unavailable: no default input device");
            return false;
        }

        if which::which(&self.recognizer_command).is_err() {
            warn!(
                "Speech recognition unavailable: {} not found in PATH",
                self.recognizer_command
            );
            return false;
        }

        true
    }
}
