//! Recorder error definitions.

use thiserror::Error;

/// Errors raised while handing a finished segment to an emitter.
#[derive(Debug, Error)]
pub enum EmitError {
    /// The document could not be serialized.
    #[error("Failed to serialize segment: {0}")]
    Serialize(#[from] serde_json::Error),

    /// The receiving side of a channel emitter is gone.
    #[error("Segment receiver disconnected")]
    Disconnected,
}

/// Errors returned when closing a segment.
#[derive(Debug, Error)]
pub enum TraceError {
    /// The segment was already closed; nothing was emitted again.
    #[error("Segment {0} is already closed")]
    AlreadyClosed(String),

    /// The handle points outside its segment tree.
    #[error("Segment index {0} does not exist")]
    UnknownSegment(usize),

    /// The emitter rejected the finished document.
    #[error("Emit failed: {0}")]
    Emit(#[from] EmitError),
}

/// Result type for recorder operations.
pub type TraceResult<T> = Result<T, TraceError>;
