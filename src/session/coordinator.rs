//! Session coordinator: the state machine tying audio focus, streaming
//! recognition, capture, and playback together.
//!
//! All transitions are serialized through one lock. Recognizer and playback
//! callbacks arrive as tagged events on a single channel, drained by a pump
//! task that takes the same lock before touching state — a late event from
//! a stream or playback that has already been stopped is recognized by its
//! epoch/sequence tag and dropped.

use std::path::PathBuf;
use std::sync::{Arc, Weak};
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info, warn};

use crate::audio::capture::{self, MicCapture};
use crate::focus::{AudioMode, AudioSessionPolicy};
use crate::permissions::PermissionGate;
use crate::playback::{
    PlayAction, PlaybackController, PlaybackEvent, PlaybackOutcome, PlaybackSource,
};
use crate::transcription::{StreamCloser, TranscriptEvent, TranscriptionEngine};

use super::error::{PermissionError, SessionError};
use super::status::{MemoId, SessionMode, SessionStatusHandle};

enum SessionEvent {
    Transcript { epoch: u64, event: TranscriptEvent },
    Playback(PlaybackEvent),
}

struct Inner {
    policy: AudioSessionPolicy,
    engine: Box<dyn TranscriptionEngine>,
    playback: PlaybackController,
    gate: Box<dyn PermissionGate>,
    /// Mic WAV capture for audio attachments; `None` disables capture.
    capture: Option<MicCapture>,
    recordings_dir: PathBuf,
    keep_unsaved_recordings: bool,
    stream: Option<StreamCloser>,
    /// Bumped on every stream open; transcript events from earlier streams
    /// are stale and ignored.
    stream_epoch: u64,
    /// Sequence of the playback we currently consider active.
    playback_seq: u64,
}

pub struct SessionCoordinator {
    inner: Arc<Mutex<Inner>>,
    status: SessionStatusHandle,
    events_tx: mpsc::UnboundedSender<SessionEvent>,
}

impl SessionCoordinator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        policy: AudioSessionPolicy,
        engine: Box<dyn TranscriptionEngine>,
        playback: PlaybackController,
        playback_events: mpsc::UnboundedReceiver<PlaybackEvent>,
        gate: Box<dyn PermissionGate>,
        capture: Option<MicCapture>,
        recordings_dir: PathBuf,
        keep_unsaved_recordings: bool,
        status: SessionStatusHandle,
    ) -> Arc<Self> {
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        let inner = Arc::new(Mutex::new(Inner {
            policy,
            engine,
            playback,
            gate,
            capture,
            recordings_dir,
            keep_unsaved_recordings,
            stream: None,
            stream_epoch: 0,
            playback_seq: 0,
        }));

        let coordinator = Arc::new(Self {
            inner: inner.clone(),
            status: status.clone(),
            events_tx: events_tx.clone(),
        });

        // Playback completions join the same serialized event path as
        // transcript events.
        let mut playback_events = playback_events;
        tokio::spawn(async move {
            while let Some(event) = playback_events.recv().await {
                if events_tx.send(SessionEvent::Playback(event)).is_err() {
                    break;
                }
            }
        });

        tokio::spawn(Self::run_pump(
            Arc::downgrade(&inner),
            status,
            events_rx,
        ));

        coordinator
    }

    pub fn status(&self) -> SessionStatusHandle {
        self.status.clone()
    }

    /// Enter Recording: permission check, audio focus, recognizer stream,
    /// optional WAV capture. A failure at any step unwinds completely — the
    /// session ends up exactly as if the call had never been made, with the
    /// failure in `last_error`.
    pub async fn start_recording(&self) -> Result<(), SessionError> {
        let mut inner = self.inner.lock().await;
        let state = self.status.get().await;

        match state.mode {
            SessionMode::Recording => {
                debug!("Already recording, start is a no-op");
                return Ok(());
            }
            SessionMode::Playing => {
                // Starting a recording always wins over playback.
                info!("Stopping playback to start recording");
                inner.playback.stop();
                if let Err(e) = inner.policy.request_mode(AudioMode::Inactive) {
                    warn!("Failed to release audio session: {}", e);
                }
                self.status.finish_playback(None).await;
            }
            SessionMode::Idle => {}
        }

        if !inner.gate.request().await {
            let err = PermissionError::Denied;
            self.status.record_failure(err.to_string()).await;
            return Err(err.into());
        }

        if let Err(e) = inner.policy.request_mode(AudioMode::Record) {
            self.status.record_failure(e.to_string()).await;
            return Err(e.into());
        }

        let stream = match inner.engine.open().await {
            Ok(stream) => stream,
            Err(e) => {
                // Never leave the audio session claimed after a failed start.
                if let Err(release) = inner.policy.request_mode(AudioMode::Inactive) {
                    warn!("Failed to release audio session: {}", release);
                }
                self.status.record_failure(e.to_string()).await;
                return Err(e.into());
            }
        };

        inner.stream_epoch += 1;
        let epoch = inner.stream_epoch;
        let (mut events, closer) = stream.split();
        inner.stream = Some(closer);

        let tx = self.events_tx.clone();
        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                if tx.send(SessionEvent::Transcript { epoch, event }).is_err() {
                    break;
                }
            }
        });

        if let Some(mic) = inner.capture.as_mut() {
            if let Err(e) = mic.start() {
                warn!("Audio capture unavailable, recording transcript only: {}", e);
            }
        }

        if !inner.keep_unsaved_recordings {
            if let Some(stale) = self.status.take_recording().await {
                if let Err(e) = std::fs::remove_file(&stale) {
                    warn!("Failed to delete unsaved recording {:?}: {}", stale, e);
                } else {
                    debug!("Deleted unsaved recording {:?}", stale);
                }
            }
        }

        self.status.begin_recording().await;
        info!("Recording started");
        Ok(())
    }

    /// Leave Recording, retaining the transcript snapshot. Calling this
    /// while not recording is a success no-op.
    pub async fn stop_recording(&self) -> Result<(), SessionError> {
        let mut inner = self.inner.lock().await;
        if self.status.get().await.mode != SessionMode::Recording {
            debug!("Stop requested while not recording, nothing to do");
            return Ok(());
        }

        info!("Recording stopped");
        Self::teardown_recording(&mut inner, &self.status, None).await;
        Ok(())
    }

    /// Start (or toggle-stop) playback of a memo.
    ///
    /// Rejected while recording: the caller must stop the recording first,
    /// so a partial transcript is never lost to an accidental tap.
    pub async fn play(&self, source: PlaybackSource, memo_id: MemoId) -> Result<(), SessionError> {
        let mut inner = self.inner.lock().await;
        let state = self.status.get().await;

        match state.mode {
            SessionMode::Recording => {
                return Err(SessionError::RecordingInProgress);
            }
            SessionMode::Playing if state.active_memo_id.as_ref() == Some(&memo_id) => {
                return self.toggle_stop(&mut inner, source, memo_id).await;
            }
            SessionMode::Playing => {
                // Fully stop the previous memo, audio focus included,
                // before the new one starts. No overlap.
                inner.playback.stop();
                if let Err(e) = inner.policy.request_mode(AudioMode::Inactive) {
                    warn!("Failed to release audio session: {}", e);
                }
                self.status.finish_playback(None).await;
            }
            SessionMode::Idle => {}
        }

        if let Err(e) = inner.policy.request_mode(AudioMode::Playback) {
            self.status.record_failure(e.to_string()).await;
            return Err(e.into());
        }

        match inner.playback.play(source, memo_id.clone()).await {
            Ok(PlayAction::Started { seq }) => {
                inner.playback_seq = seq;
                self.status.begin_playback(memo_id).await;
                Ok(())
            }
            Ok(PlayAction::ToggledOff) => {
                // The controller still considered this memo active even
                // though the session did not; settle on idle.
                if let Err(e) = inner.policy.request_mode(AudioMode::Inactive) {
                    warn!("Failed to release audio session: {}", e);
                }
                self.status.finish_playback(None).await;
                Ok(())
            }
            Err(e) => {
                if let Err(release) = inner.policy.request_mode(AudioMode::Inactive) {
                    warn!("Failed to release audio session: {}", release);
                }
                self.status.record_failure(e.to_string()).await;
                Err(e.into())
            }
        }
    }

    /// Stop playback if any is running; a no-op otherwise, even when the
    /// underlying player never fully started.
    pub async fn stop_playback(&self) {
        let mut inner = self.inner.lock().await;
        if self.status.get().await.mode != SessionMode::Playing {
            return;
        }

        inner.playback.stop();
        if let Err(e) = inner.policy.request_mode(AudioMode::Inactive) {
            warn!("Failed to release audio session: {}", e);
        }
        self.status.finish_playback(None).await;
    }

    /// Consume the retained transcript snapshot (for saving as a memo).
    pub async fn take_transcript(&self) -> Option<String> {
        self.status.take_transcript().await
    }

    /// Consume the last captured recording path.
    pub async fn take_recording(&self) -> Option<PathBuf> {
        self.status.take_recording().await
    }

    /// Tear everything down when the hosting session ends.
    pub async fn shutdown(&self) {
        let mut inner = self.inner.lock().await;
        info!("Session coordinator shutting down");

        if let Some(mut closer) = inner.stream.take() {
            closer.close();
        }
        if let Some(mic) = inner.capture.as_mut() {
            if mic.is_active() {
                let _ = mic.stop();
            }
        }
        inner.playback.stop();
        if let Err(e) = inner.policy.request_mode(AudioMode::Inactive) {
            warn!("Failed to release audio session: {}", e);
        }
        self.status.reset().await;
    }

    async fn toggle_stop(
        &self,
        inner: &mut Inner,
        source: PlaybackSource,
        memo_id: MemoId,
    ) -> Result<(), SessionError> {
        match inner.playback.play(source, memo_id.clone()).await {
            Ok(PlayAction::ToggledOff) => {
                if let Err(e) = inner.policy.request_mode(AudioMode::Inactive) {
                    warn!("Failed to release audio session: {}", e);
                }
                self.status.finish_playback(None).await;
                Ok(())
            }
            Ok(PlayAction::Started { seq }) => {
                // Natural completion raced the toggle; the controller has
                // started the memo afresh.
                inner.playback_seq = seq;
                self.status.begin_playback(memo_id).await;
                Ok(())
            }
            Err(e) => {
                if let Err(release) = inner.policy.request_mode(AudioMode::Inactive) {
                    warn!("Failed to release audio session: {}", release);
                }
                self.status.record_failure(e.to_string()).await;
                Err(e.into())
            }
        }
    }

    /// Shared exit path from Recording: close the stream, finish capture,
    /// yield audio focus, publish the final state. The transcript snapshot
    /// stays in place for the caller to consume.
    async fn teardown_recording(
        inner: &mut Inner,
        status: &SessionStatusHandle,
        error: Option<String>,
    ) {
        if let Some(mut closer) = inner.stream.take() {
            closer.close();
        }

        let recording = Self::finish_capture(inner);

        if let Err(e) = inner.policy.request_mode(AudioMode::Inactive) {
            warn!("Failed to release audio session: {}", e);
        }

        status.finish_recording(recording, error).await;
    }

    /// Stop the WAV capture (if it ever started) and flush it to disk.
    /// Capture problems degrade to a transcript-only recording.
    fn finish_capture(inner: &mut Inner) -> Option<PathBuf> {
        let mic = inner.capture.as_mut()?;
        if !mic.is_active() {
            return None;
        }

        let samples = match mic.stop() {
            Ok(samples) => samples,
            Err(e) => {
                warn!("Failed to stop mic capture: {}", e);
                return None;
            }
        };
        if samples.is_empty() {
            return None;
        }

        let path = capture::timestamped_wav(&inner.recordings_dir);
        match capture::write_wav(&path, &samples, mic.sample_rate()) {
            Ok(()) => Some(path),
            Err(e) => {
                warn!("Failed to write recording WAV: {}", e);
                None
            }
        }
    }

    async fn run_pump(
        inner: Weak<Mutex<Inner>>,
        status: SessionStatusHandle,
        mut events_rx: mpsc::UnboundedReceiver<SessionEvent>,
    ) {
        while let Some(event) = events_rx.recv().await {
            let Some(inner) = inner.upgrade() else {
                break;
            };
            let mut inner = inner.lock().await;

            match event {
                SessionEvent::Transcript { epoch, event } => {
                    if inner.stream.is_none() || epoch != inner.stream_epoch {
                        debug!("Dropping stale transcript event (epoch {})", epoch);
                        continue;
                    }

                    match event {
                        TranscriptEvent::Partial { text, is_final: false } => {
                            status.set_transcript(text).await;
                        }
                        TranscriptEvent::Partial { text, is_final: true } => {
                            // The stream auto-closes on a final result;
                            // treat it as an implicit stop request.
                            info!("Recognition finished");
                            status.set_transcript(text).await;
                            Self::teardown_recording(&mut inner, &status, None).await;
                        }
                        TranscriptEvent::Error(e) => {
                            warn!("Recognition failed: {}", e);
                            Self::teardown_recording(&mut inner, &status, Some(e.to_string()))
                                .await;
                        }
                    }
                }
                SessionEvent::Playback(event) => {
                    let state = status.get().await;
                    let current = state.mode == SessionMode::Playing
                        && state.active_memo_id.as_ref() == Some(&event.memo_id)
                        && event.seq == inner.playback_seq;
                    if !current {
                        debug!("Dropping stale playback event (seq {})", event.seq);
                        continue;
                    }

                    inner.playback.acknowledge(event.seq);
                    if let Err(e) = inner.policy.request_mode(AudioMode::Inactive) {
                        warn!("Failed to release audio session: {}", e);
                    }

                    let error = match event.outcome {
                        PlaybackOutcome::Completed => {
                            info!("Playback of memo {} finished", event.memo_id);
                            None
                        }
                        PlaybackOutcome::Failed(e) => {
                            warn!("Playback of memo {} failed: {}", event.memo_id, e);
                            Some(e.to_string())
                        }
                    };
                    status.finish_playback(error).await;
                }
            }
        }

        debug!("Session event pump exiting");
    }
}
