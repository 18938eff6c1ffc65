//! External-process playback backend.
//!
//! Text memos are spoken through a TTS binary (espeak-ng by default);
//! audio memos go through a player binary (ffplay by default). Both are
//! discovered via `which` at start time so a missing tool surfaces as a
//! recoverable error with an install hint, not a crash.

use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::process::{Child, Command};
use tokio::sync::oneshot;
use tracing::{debug, info};

use super::{PlaybackBackend, PlaybackHandle, PlaybackSource};
use crate::config::SpeechConfig;
use crate::session::PlaybackError;

#[derive(Debug, Clone, Copy)]
enum SourceKind {
    Speech,
    File,
}

pub struct ProcessPlayback {
    synth_command: String,
    voice: String,
    rate: u32,
    player_command: String,
}

impl ProcessPlayback {
    pub fn new(config: &SpeechConfig) -> Self {
        Self {
            synth_command: config.synth_command.clone(),
            voice: config.voice.clone(),
            rate: config.rate,
            player_command: config.player_command.clone(),
        }
    }

    fn spawn_synthesizer(&self, text: &str) -> Result<Child, PlaybackError> {
        let binary = which::which(&self.synth_command).map_err(|_| {
            PlaybackError::Synthesis(format!(
                "{} not found in PATH. Install it (e.g. apt install espeak-ng) or set \
                 [speech].synth_command",
                self.synth_command
            ))
        })?;

        Command::new(&binary)
            .arg("-v")
            .arg(&self.voice)
            .arg("-s")
            .arg(self.rate.to_string())
            .arg(text)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| PlaybackError::Synthesis(e.to_string()))
    }

    fn spawn_player(&self, path: &PathBuf) -> Result<Child, PlaybackError> {
        if !path.exists() {
            return Err(PlaybackError::FileNotFound(path.clone()));
        }

        let binary = which::which(&self.player_command).map_err(|_| {
            PlaybackError::Decode(format!(
                "{} not found in PATH. Install ffmpeg or set [speech].player_command",
                self.player_command
            ))
        })?;

        Command::new(&binary)
            .arg("-nodisp")
            .arg("-autoexit")
            .arg("-loglevel")
            .arg("error")
            .arg(path)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| PlaybackError::Decode(e.to_string()))
    }
}

#[async_trait]
impl PlaybackBackend for ProcessPlayback {
    async fn start(&self, source: &PlaybackSource) -> Result<PlaybackHandle, PlaybackError> {
        let (mut child, kind) = match source {
            PlaybackSource::Text(text) => {
                info!("Speaking memo text ({} chars)", text.len());
                (self.spawn_synthesizer(text)?, SourceKind::Speech)
            }
            PlaybackSource::AudioFile(path) => {
                info!("Playing audio memo {:?}", path);
                (self.spawn_player(path)?, SourceKind::File)
            }
        };

        let (stop_tx, mut stop_rx) = oneshot::channel::<()>();
        let (done_tx, done_rx) = oneshot::channel();

        tokio::spawn(async move {
            tokio::select! {
                _ = &mut stop_rx => {
                    debug!("Playback cancelled, killing player");
                    let _ = child.start_kill();
                    let _ = child.wait().await;
                    // Dropping done_tx unresolved marks this as cancelled.
                }
                status = child.wait() => {
                    let result = match status {
                        Ok(status) if status.success() => Ok(()),
                        Ok(status) => Err(match kind {
                            SourceKind::Speech => PlaybackError::Synthesis(format!(
                                "synthesizer exited with {}",
                                status
                            )),
                            SourceKind::File => PlaybackError::Decode(format!(
                                "player exited with {}",
                                status
                            )),
                        }),
                        Err(e) => Err(match kind {
                            SourceKind::Speech => PlaybackError::Synthesis(e.to_string()),
                            SourceKind::File => PlaybackError::Decode(e.to_string()),
                        }),
                    };
                    let _ = done_tx.send(result);
                }
            }
        });

        Ok(PlaybackHandle::new(stop_tx, done_rx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_audio_file_is_file_not_found() {
        let backend = ProcessPlayback::new(&SpeechConfig::default());
        let missing = PathBuf::from("/nonexistent/koemo-memo.wav");

        match backend.start(&PlaybackSource::AudioFile(missing.clone())).await {
            Err(PlaybackError::FileNotFound(path)) => assert_eq!(path, missing),
            other => panic!("expected FileNotFound, got {:?}", other.err()),
        }
    }

    #[tokio::test]
    async fn test_missing_synthesizer_is_synthesis_error() {
        let config = SpeechConfig {
            synth_command: "koemo-definitely-missing-tts".to_string(),
            ..Default::default()
        };
        let backend = ProcessPlayback::new(&config);

        match backend
            .start(&PlaybackSource::Text("こんにちは".to_string()))
            .await
        {
            Err(PlaybackError::Synthesis(msg)) => {
                assert!(msg.contains("koemo-definitely-missing-tts"));
            }
            other => panic!("expected Synthesis, got {:?}", other.err()),
        }
    }
}
