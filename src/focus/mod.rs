//! Audio focus arbitration.
//!
//! The device session (microphone/speaker) is a single process-wide
//! resource. Everything that needs it goes through `AudioSessionPolicy`;
//! no other component activates or deactivates the session directly.

use tracing::{debug, info};

use crate::session::AudioSessionError;

/// Direction the device session is configured for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioMode {
    /// Session released; other audio users may resume.
    Inactive,
    /// Input category: microphone capture for recognition.
    Record,
    /// Output category: TTS or recorded-audio playback.
    Playback,
}

impl AudioMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Inactive => "inactive",
            Self::Record => "record",
            Self::Playback => "playback",
        }
    }
}

/// Platform seam for the actual session switch.
pub trait AudioSessionBackend: Send {
    /// Configure and activate the session for the given direction.
    fn configure(&mut self, mode: AudioMode) -> Result<(), AudioSessionError>;

    /// Deactivate the session, yielding audio focus to other users.
    fn deactivate(&mut self) -> Result<(), AudioSessionError>;
}

/// Decides which mode the device session should be in and issues
/// activate/deactivate requests against the backend.
pub struct AudioSessionPolicy {
    backend: Box<dyn AudioSessionBackend>,
    current: AudioMode,
}

impl AudioSessionPolicy {
    pub fn new(backend: Box<dyn AudioSessionBackend>) -> Self {
        Self {
            backend,
            current: AudioMode::Inactive,
        }
    }

    /// Switch the session to `target`. Requesting the mode already active is
    /// a success no-op. On failure the previous mode is left in place and
    /// the caller must not proceed with recording/playback.
    pub fn request_mode(&mut self, target: AudioMode) -> Result<(), AudioSessionError> {
        if target == self.current {
            debug!("Audio session already in {} mode", target.as_str());
            return Ok(());
        }

        match target {
            AudioMode::Inactive => self.backend.deactivate()?,
            mode => self.backend.configure(mode)?,
        }

        info!(
            "Audio session: {} -> {}",
            self.current.as_str(),
            target.as_str()
        );
        self.current = target;
        Ok(())
    }

    pub fn current(&self) -> AudioMode {
        self.current
    }
}

/// Backend for hosts without a cooperative audio-session service: verifies
/// the default device for the requested direction exists, and treats
/// deactivation as releasing our claim.
pub struct DeviceSession;

impl AudioSessionBackend for DeviceSession {
    fn configure(&mut self, mode: AudioMode) -> Result<(), AudioSessionError> {
        use cpal::traits::HostTrait;

        let host = cpal::default_host();
        match mode {
            AudioMode::Record => {
                if host.default_input_device().is_none() {
                    return Err(AudioSessionError::DeviceUnavailable("input"));
                }
            }
            AudioMode::Playback => {
                if host.default_output_device().is_none() {
                    return Err(AudioSessionError::DeviceUnavailable("output"));
                }
            }
            AudioMode::Inactive => {}
        }
        Ok(())
    }

    fn deactivate(&mut self) -> Result<(), AudioSessionError> {
        debug!("Audio session released");
        Ok(())
    }
}
