//! Streaming speech-to-text.
//!
//! A `TranscriptionEngine` opens a `TranscriptionStream` that delivers
//! incremental transcript events until it is closed, cancelled, or errors.

pub mod recognizer;
pub mod stream;

pub use recognizer::CommandRecognizer;
pub use stream::{StreamCloser, TranscriptionStream};

use async_trait::async_trait;

use crate::session::TranscriptionError;

/// Event delivered by an open transcription stream.
///
/// `text` values are monotonically more complete transcriptions of the same
/// recording; consumers must replace, never append, the displayed text.
/// An event with `is_final == true` (or an `Error`) is the last one — the
/// stream auto-closes after it.
#[derive(Debug, Clone)]
pub enum TranscriptEvent {
    Partial { text: String, is_final: bool },
    Error(TranscriptionError),
}

/// Factory seam for opening recognition streams.
#[async_trait]
pub trait TranscriptionEngine: Send + Sync {
    async fn open(&self) -> Result<TranscriptionStream, TranscriptionError>;
}
