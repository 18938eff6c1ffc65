use crate::global;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::info;

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub recognizer: RecognizerConfig,
    pub speech: SpeechConfig,
    pub api: ApiConfig,
    pub memos: MemoConfig,
    pub behavior: BehaviorConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecognizerConfig {
    /// Streaming recognizer binary. Must print incremental transcription
    /// lines on stdout (whisper.cpp's stream binary does).
    pub command: String,
    /// Model file passed to the recognizer via -m.
    pub model_path: Option<String>,
    pub language: String,
    /// Extra arguments appended to the recognizer invocation.
    pub extra_args: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeechConfig {
    /// Text-to-speech binary used for spoken memo playback.
    pub synth_command: String,
    pub voice: String,
    /// Speaking rate in words per minute.
    pub rate: u32,
    /// Player binary used for recorded-audio memo playback.
    pub player_command: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoConfig {
    /// Display color assigned to memos saved without an explicit color.
    pub default_color: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BehaviorConfig {
    /// Also capture microphone audio to a WAV file while recording, so a
    /// saved memo can carry an audio attachment.
    pub capture_audio: bool,
    /// Keep WAV files of recordings that were never saved as memos.
    pub keep_unsaved_recordings: bool,
}

impl Default for RecognizerConfig {
    fn default() -> Self {
        Self {
            command: "whisper-stream".to_string(),
            model_path: None,
            language: "ja".to_string(),
            extra_args: Vec::new(),
        }
    }
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            synth_command: "espeak-ng".to_string(),
            voice: "ja".to_string(),
            rate: 160,
            player_command: "ffplay".to_string(),
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self { port: 3948 }
    }
}

impl Default for MemoConfig {
    fn default() -> Self {
        Self {
            default_color: "#007AFF".to_string(),
        }
    }
}

impl Default for BehaviorConfig {
    fn default() -> Self {
        Self {
            capture_audio: true,
            keep_unsaved_recordings: false,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;
        if !config_path.exists() {
            info!(
                "Config file not found, creating default at {:?}",
                config_path
            );
            let config = Self::default();
            config.save()?;
            return Ok(config);
        }

        let content =
            std::fs::read_to_string(&config_path).context("Failed to read config file")?;

        let config: Self = toml::from_str(&content).context("Failed to parse config file")?;

        info!("Loaded config from {:?}", config_path);
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;

        std::fs::write(&config_path, content).context("Failed to write config file")?;

        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        global::config_file()
    }
}
