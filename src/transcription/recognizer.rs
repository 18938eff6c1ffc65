//! External streaming recognizer.
//!
//! Spawns a whisper.cpp-style stream binary that captures the microphone
//! itself and prints incremental transcription lines on stdout. Each line is
//! cleaned of timestamps/control noise and folded into an accumulated
//! transcript, so every emitted event carries the full text so far.

use anyhow::Result;
use async_trait::async_trait;
use regex::Regex;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use super::{TranscriptEvent, TranscriptionEngine, TranscriptionStream};
use crate::config::RecognizerConfig;
use crate::session::TranscriptionError;

pub struct CommandRecognizer {
    command: String,
    model_path: Option<String>,
    language: String,
    extra_args: Vec<String>,
    timestamp_regex: Regex,
}

impl CommandRecognizer {
    pub fn new(config: &RecognizerConfig) -> Result<Self> {
        // Matches timestamps like [00:00:00.000 --> 00:00:03.280]
        let timestamp_regex =
            Regex::new(r"\[\d{2}:\d{2}:\d{2}[:.]\d{3}\s*-->\s*\d{2}:\d{2}:\d{2}[:.]\d{3}\]\s*")?;

        Ok(Self {
            command: config.command.clone(),
            model_path: config.model_path.clone(),
            language: config.language.clone(),
            extra_args: config.extra_args.clone(),
            timestamp_regex,
        })
    }
}

/// Strip timestamps and control markers from one recognizer line. Returns
/// `None` for lines that carry no transcript text, e.g. "[Start speaking]"
/// or blank keep-alive output.
fn clean_line(timestamp_regex: &Regex, line: &str) -> Option<String> {
    let cleaned = timestamp_regex.replace_all(line, "");
    let trimmed = cleaned.trim();

    if trimmed.is_empty() {
        return None;
    }
    // Control markers arrive fully bracketed or parenthesised.
    if (trimmed.starts_with('[') && trimmed.ends_with(']'))
        || (trimmed.starts_with('(') && trimmed.ends_with(')'))
    {
        return None;
    }

    Some(trimmed.to_string())
}

fn append_segment(transcript: &mut String, segment: &str) {
    if !transcript.is_empty() {
        transcript.push(' ');
    }
    transcript.push_str(segment);
}

#[async_trait]
impl TranscriptionEngine for CommandRecognizer {
    async fn open(&self) -> Result<TranscriptionStream, TranscriptionError> {
        let binary = which::which(&self.command).map_err(|_| {
            TranscriptionError::RecognizerUnavailable(format!(
                "{} not found in PATH",
                self.command
            ))
        })?;

        let mut command = Command::new(&binary);
        command
            .arg("-l")
            .arg(&self.language)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true);

        if let Some(model) = &self.model_path {
            command.arg("-m").arg(model);
        }
        command.args(&self.extra_args);

        let mut child = command
            .spawn()
            .map_err(|e| TranscriptionError::EngineStart(e.to_string()))?;

        let stdout = child.stdout.take().ok_or_else(|| {
            TranscriptionError::EngineStart("recognizer stdout not captured".to_string())
        })?;

        info!("Recognizer started: {:?} (language {})", binary, self.language);

        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();

        let timestamp_regex = self.timestamp_regex.clone();

        tokio::spawn(async move {
            let mut lines = BufReader::new(stdout).lines();
            let mut transcript = String::new();

            loop {
                tokio::select! {
                    _ = &mut shutdown_rx => {
                        debug!("Recognizer cancelled, killing child");
                        let _ = child.start_kill();
                        break;
                    }
                    line = lines.next_line() => match line {
                        Ok(Some(line)) => {
                            let Some(segment) = clean_line(&timestamp_regex, &line) else {
                                continue;
                            };
                            append_segment(&mut transcript, &segment);
                            let _ = events_tx.send(TranscriptEvent::Partial {
                                text: transcript.clone(),
                                is_final: false,
                            });
                        }
                        Ok(None) => {
                            // Recognizer exited on its own; whatever we have
                            // accumulated is the final result.
                            debug!("Recognizer stdout closed");
                            let _ = events_tx.send(TranscriptEvent::Partial {
                                text: transcript.clone(),
                                is_final: true,
                            });
                            break;
                        }
                        Err(e) => {
                            warn!("Recognizer read failed: {}", e);
                            let _ = child.start_kill();
                            let _ = events_tx.send(TranscriptEvent::Error(
                                TranscriptionError::Recognition(e.to_string()),
                            ));
                            break;
                        }
                    }
                }
            }

            let _ = child.wait().await;
        });

        Ok(TranscriptionStream::new(events_rx, shutdown_tx))
    }
}
