//! Memo playback: TTS for text memos, an external player for audio memos.
//!
//! The controller tracks which memo is currently sounding. Calling `play`
//! for that same memo is a toggle-stop; playing a different memo fully stops
//! the previous one first, so playback never overlaps. Natural completion
//! and asynchronous failures are reported on an event channel; cancellation
//! via `stop()` is synchronous and produces no event.

pub mod process;

pub use process::ProcessPlayback;

use async_trait::async_trait;
use std::path::PathBuf;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::session::{MemoId, PlaybackError};

#[derive(Debug, Clone)]
pub enum PlaybackSource {
    /// Speak the memo text through the synthesizer.
    Text(String),
    /// Play the memo's recorded audio file.
    AudioFile(PathBuf),
}

#[derive(Debug, Clone)]
pub enum PlaybackOutcome {
    Completed,
    Failed(PlaybackError),
}

/// Asynchronous notification that a started playback ended on its own.
#[derive(Debug, Clone)]
pub struct PlaybackEvent {
    pub seq: u64,
    pub memo_id: MemoId,
    pub outcome: PlaybackOutcome,
}

/// Result of a `play` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayAction {
    Started { seq: u64 },
    /// The requested memo was already sounding and has been stopped.
    ToggledOff,
}

/// A running playback handed out by a backend.
///
/// `done` resolves only when playback terminates on its own (source
/// exhausted or failed); after a `stop` signal the backend drops the sender
/// without resolving it.
pub struct PlaybackHandle {
    stop: oneshot::Sender<()>,
    done: oneshot::Receiver<Result<(), PlaybackError>>,
}

impl PlaybackHandle {
    pub fn new(
        stop: oneshot::Sender<()>,
        done: oneshot::Receiver<Result<(), PlaybackError>>,
    ) -> Self {
        Self { stop, done }
    }
}

/// Platform seam that actually produces sound.
#[async_trait]
pub trait PlaybackBackend: Send + Sync {
    async fn start(&self, source: &PlaybackSource) -> Result<PlaybackHandle, PlaybackError>;
}

struct CurrentPlayback {
    memo_id: MemoId,
    seq: u64,
    stop: oneshot::Sender<()>,
}

pub struct PlaybackController {
    backend: Box<dyn PlaybackBackend>,
    events_tx: mpsc::UnboundedSender<PlaybackEvent>,
    current: Option<CurrentPlayback>,
    next_seq: u64,
}

impl PlaybackController {
    /// Returns the controller and the receiver for its completion events.
    pub fn new(
        backend: Box<dyn PlaybackBackend>,
    ) -> (Self, mpsc::UnboundedReceiver<PlaybackEvent>) {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        (
            Self {
                backend,
                events_tx,
                current: None,
                next_seq: 0,
            },
            events_rx,
        )
    }

    /// Start sounding `memo_id`, honoring the toggle-stop and
    /// stop-previous-first contracts. Any failure leaves the controller in
    /// the same idle state as a clean stop.
    pub async fn play(
        &mut self,
        source: PlaybackSource,
        memo_id: MemoId,
    ) -> Result<PlayAction, PlaybackError> {
        if self.playing() == Some(&memo_id) {
            info!("Memo {} already playing, toggling off", memo_id);
            self.stop();
            return Ok(PlayAction::ToggledOff);
        }

        // A different memo is sounding: fully stop it before starting.
        if self.current.is_some() {
            self.stop();
        }

        let handle = self.backend.start(&source).await?;

        self.next_seq += 1;
        let seq = self.next_seq;

        let events_tx = self.events_tx.clone();
        let event_memo_id = memo_id.clone();
        let done = handle.done;
        tokio::spawn(async move {
            let outcome = match done.await {
                Ok(Ok(())) => PlaybackOutcome::Completed,
                Ok(Err(e)) => PlaybackOutcome::Failed(e),
                // Sender dropped without resolving: playback was stopped.
                Err(_) => return,
            };
            let _ = events_tx.send(PlaybackEvent {
                seq,
                memo_id: event_memo_id,
                outcome,
            });
        });

        info!("Playback started for memo {} (seq {})", memo_id, seq);
        self.current = Some(CurrentPlayback {
            memo_id,
            seq,
            stop: handle.stop,
        });

        Ok(PlayAction::Started { seq })
    }

    /// Stop whatever is sounding. A no-op when nothing is, including when
    /// the underlying player never fully started.
    pub fn stop(&mut self) {
        let Some(current) = self.current.take() else {
            debug!("Playback stop requested while idle, ignoring");
            return;
        };

        info!("Stopping playback of memo {}", current.memo_id);
        if current.stop.send(()).is_err() {
            // Player already exited; its completion event (if any) is
            // discarded by the sequence check upstream.
            warn!("Playback of memo {} had already ended", current.memo_id);
        }
    }

    /// Clear the current slot after its completion event was consumed.
    pub fn acknowledge(&mut self, seq: u64) {
        if self.current.as_ref().map(|c| c.seq) == Some(seq) {
            self.current = None;
        }
    }

    pub fn playing(&self) -> Option<&MemoId> {
        self.current.as_ref().map(|c| &c.memo_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use tokio::sync::oneshot::error::TryRecvError;

    /// Backend whose playbacks never end until the test resolves them.
    ///
    /// Stop signals are observed synchronously: the next `start` call drains
    /// any fired stop receivers into the log first, so "stopped" vs "start"
    /// ordering in the log is deterministic.
    struct ScriptedBackend {
        log: Arc<Mutex<Vec<String>>>,
        stops: Arc<Mutex<Vec<oneshot::Receiver<()>>>>,
        done_txs: Arc<Mutex<Vec<oneshot::Sender<Result<(), PlaybackError>>>>>,
        fail_start: bool,
    }

    fn drain_fired_stops(
        stops: &Mutex<Vec<oneshot::Receiver<()>>>,
        log: &mut Vec<String>,
    ) {
        stops.lock().unwrap().retain_mut(|rx| match rx.try_recv() {
            Ok(()) => {
                log.push("stopped".to_string());
                false
            }
            Err(TryRecvError::Empty) => true,
            Err(TryRecvError::Closed) => false,
        });
    }

    #[async_trait]
    impl PlaybackBackend for ScriptedBackend {
        async fn start(&self, source: &PlaybackSource) -> Result<PlaybackHandle, PlaybackError> {
            if self.fail_start {
                return Err(PlaybackError::Synthesis("no synthesizer".to_string()));
            }

            let mut log = self.log.lock().unwrap();
            drain_fired_stops(&self.stops, &mut log);

            let label = match source {
                PlaybackSource::Text(text) => format!("start:text:{}", text),
                PlaybackSource::AudioFile(path) => format!("start:file:{}", path.display()),
            };
            log.push(label);
            drop(log);

            let (stop_tx, stop_rx) = oneshot::channel();
            let (done_tx, done_rx) = oneshot::channel();
            self.stops.lock().unwrap().push(stop_rx);
            self.done_txs.lock().unwrap().push(done_tx);

            Ok(PlaybackHandle::new(stop_tx, done_rx))
        }
    }

    struct TestRig {
        controller: PlaybackController,
        events: mpsc::UnboundedReceiver<PlaybackEvent>,
        log: Arc<Mutex<Vec<String>>>,
        stops: Arc<Mutex<Vec<oneshot::Receiver<()>>>>,
        done_txs: Arc<Mutex<Vec<oneshot::Sender<Result<(), PlaybackError>>>>>,
    }

    impl TestRig {
        fn new(fail_start: bool) -> Self {
            let log = Arc::new(Mutex::new(Vec::new()));
            let stops = Arc::new(Mutex::new(Vec::new()));
            let done_txs = Arc::new(Mutex::new(Vec::new()));
            let backend = ScriptedBackend {
                log: log.clone(),
                stops: stops.clone(),
                done_txs: done_txs.clone(),
                fail_start,
            };
            let (controller, events) = PlaybackController::new(Box::new(backend));
            Self {
                controller,
                events,
                log,
                stops,
                done_txs,
            }
        }

        fn stop_fired(&self) -> bool {
            self.stops
                .lock()
                .unwrap()
                .iter_mut()
                .any(|rx| rx.try_recv().is_ok())
        }

        fn log(&self) -> Vec<String> {
            self.log.lock().unwrap().clone()
        }
    }

    #[tokio::test]
    async fn test_play_same_memo_toggles_off() {
        let mut rig = TestRig::new(false);

        let action = rig
            .controller
            .play(PlaybackSource::Text("hello".to_string()), "m1".to_string())
            .await
            .unwrap();
        assert!(matches!(action, PlayAction::Started { .. }));
        assert_eq!(rig.controller.playing().map(String::as_str), Some("m1"));

        let action = rig
            .controller
            .play(PlaybackSource::Text("hello".to_string()), "m1".to_string())
            .await
            .unwrap();
        assert_eq!(action, PlayAction::ToggledOff);
        assert!(rig.controller.playing().is_none());
        assert!(rig.stop_fired());
    }

    #[tokio::test]
    async fn test_play_other_memo_stops_previous_first() {
        let mut rig = TestRig::new(false);

        rig.controller
            .play(PlaybackSource::Text("one".to_string()), "m1".to_string())
            .await
            .unwrap();
        rig.controller
            .play(PlaybackSource::Text("two".to_string()), "m2".to_string())
            .await
            .unwrap();

        assert_eq!(
            rig.log(),
            vec!["start:text:one", "stopped", "start:text:two"]
        );
        assert_eq!(rig.controller.playing().map(String::as_str), Some("m2"));
    }

    #[tokio::test]
    async fn test_stop_while_idle_is_noop() {
        let mut rig = TestRig::new(false);
        rig.controller.stop();
        assert!(rig.log().is_empty());
    }

    #[tokio::test]
    async fn test_natural_completion_emits_event() {
        let mut rig = TestRig::new(false);

        let action = rig
            .controller
            .play(PlaybackSource::Text("done soon".to_string()), "m1".to_string())
            .await
            .unwrap();
        let PlayAction::Started { seq } = action else {
            panic!("expected start");
        };

        rig.done_txs.lock().unwrap().remove(0).send(Ok(())).unwrap();

        let event = rig.events.recv().await.unwrap();
        assert_eq!(event.seq, seq);
        assert_eq!(event.memo_id, "m1");
        assert!(matches!(event.outcome, PlaybackOutcome::Completed));

        rig.controller.acknowledge(event.seq);
        assert!(rig.controller.playing().is_none());
    }

    #[tokio::test]
    async fn test_cancel_emits_no_event() {
        let mut rig = TestRig::new(false);

        rig.controller
            .play(PlaybackSource::Text("quiet".to_string()), "m1".to_string())
            .await
            .unwrap();
        rig.controller.stop();

        tokio::task::yield_now().await;
        assert!(rig.events.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_failed_start_leaves_controller_idle() {
        let mut rig = TestRig::new(true);

        let err = rig
            .controller
            .play(PlaybackSource::Text("nope".to_string()), "m1".to_string())
            .await
            .unwrap_err();
        assert!(matches!(err, PlaybackError::Synthesis(_)));
        assert!(rig.controller.playing().is_none());
    }

    #[tokio::test]
    async fn test_stale_acknowledge_keeps_current() {
        let mut rig = TestRig::new(false);

        rig.controller
            .play(PlaybackSource::Text("one".to_string()), "m1".to_string())
            .await
            .unwrap();
        let PlayAction::Started { seq } = rig
            .controller
            .play(PlaybackSource::Text("two".to_string()), "m2".to_string())
            .await
            .unwrap()
        else {
            panic!("expected start");
        };

        // Acknowledging the superseded playback must not clear m2.
        rig.controller.acknowledge(seq - 1);
        assert_eq!(rig.controller.playing().map(String::as_str), Some("m2"));
        rig.controller.acknowledge(seq);
        assert!(rig.controller.playing().is_none());
    }
}
