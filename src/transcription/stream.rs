//! Handle for one open recognition stream.

use tokio::sync::{mpsc, oneshot};
use tracing::debug;

use super::TranscriptEvent;

/// An open recognition stream: an event receiver plus a cancellation handle.
///
/// Events arrive on a single channel, so no two events for the same stream
/// are ever concurrent with each other.
pub struct TranscriptionStream {
    events: Option<mpsc::UnboundedReceiver<TranscriptEvent>>,
    shutdown: Option<oneshot::Sender<()>>,
}

impl TranscriptionStream {
    pub fn new(
        events: mpsc::UnboundedReceiver<TranscriptEvent>,
        shutdown: oneshot::Sender<()>,
    ) -> Self {
        Self {
            events: Some(events),
            shutdown: Some(shutdown),
        }
    }

    /// Next event, or `None` once the producer has shut down.
    pub async fn next_event(&mut self) -> Option<TranscriptEvent> {
        match self.events.as_mut() {
            Some(events) => events.recv().await,
            None => None,
        }
    }

    /// Cancel in-flight recognition and release the input tap. Safe to call
    /// multiple times; subsequent calls are no-ops.
    pub fn close(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            debug!("Closing transcription stream");
            let _ = shutdown.send(());
        }
    }

    /// Split into the event half (consumed by a forwarding task) and a
    /// closer the owner keeps for cancellation.
    pub fn split(mut self) -> (mpsc::UnboundedReceiver<TranscriptEvent>, StreamCloser) {
        let closer = StreamCloser {
            shutdown: self.shutdown.take(),
        };
        let events = self.events.take().unwrap_or_else(|| {
            // Already-split stream; hand back a drained channel.
            let (_tx, rx) = mpsc::unbounded_channel();
            rx
        });
        (events, closer)
    }
}

impl Drop for TranscriptionStream {
    fn drop(&mut self) {
        self.close();
    }
}

/// Cancellation half of a split stream. Closing is idempotent.
pub struct StreamCloser {
    shutdown: Option<oneshot::Sender<()>>,
}

impl StreamCloser {
    pub fn close(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            debug!("Closing transcription stream");
            let _ = shutdown.send(());
        }
    }
}

impl Drop for StreamCloser {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stream() -> (
        TranscriptionStream,
        mpsc::UnboundedSender<TranscriptEvent>,
        oneshot::Receiver<()>,
    ) {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        (
            TranscriptionStream::new(events_rx, shutdown_tx),
            events_tx,
            shutdown_rx,
        )
    }

    #[tokio::test]
    async fn test_events_arrive_in_order() {
        let (mut stream, events_tx, _shutdown_rx) = stream();

        events_tx
            .send(TranscriptEvent::Partial {
                text: "こんにち".to_string(),
                is_final: false,
            })
            .unwrap();
        events_tx
            .send(TranscriptEvent::Partial {
                text: "こんにちは".to_string(),
                is_final: true,
            })
            .unwrap();

        match stream.next_event().await.unwrap() {
            TranscriptEvent::Partial { text, is_final } => {
                assert_eq!(text, "こんにち");
                assert!(!is_final);
            }
            other => panic!("unexpected event: {:?}", other),
        }
        match stream.next_event().await.unwrap() {
            TranscriptEvent::Partial { text, is_final } => {
                assert_eq!(text, "こんにちは");
                assert!(is_final);
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_close_signals_producer_once() {
        let (mut stream, _events_tx, mut shutdown_rx) = stream();

        stream.close();
        stream.close();
        stream.close();

        assert!(shutdown_rx.try_recv().is_ok());
    }

    #[tokio::test]
    async fn test_split_closer_is_idempotent() {
        let (stream, _events_tx, mut shutdown_rx) = stream();
        let (_events, mut closer) = stream.split();

        closer.close();
        closer.close();
        assert!(shutdown_rx.try_recv().is_ok());
    }

    #[tokio::test]
    async fn test_drop_closes_stream() {
        let (stream, _events_tx, mut shutdown_rx) = stream();
        drop(stream);
        assert!(shutdown_rx.try_recv().is_ok());
    }
}
