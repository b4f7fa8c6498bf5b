//! Destinations for finished segment documents.
//!
//! # Design Decisions
//! - `emit` must not block: emitters log, queue or drop
//! - Trait object seam so the recorder does not care where documents go

use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::config::schema::EmitterKind;
use crate::recorder::error::EmitError;
use crate::recorder::segment::SegmentDocument;

/// Receives finished segment documents.
pub trait Emitter: Send + Sync + fmt::Debug {
    fn emit(&self, document: &SegmentDocument) -> Result<(), EmitError>;
}

/// Writes each document as a JSON field on a structured log event.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogEmitter;

impl Emitter for LogEmitter {
    fn emit(&self, document: &SegmentDocument) -> Result<(), EmitError> {
        let json = serde_json::to_string(document)?;
        tracing::info!(
            target: "xray::segment",
            trace_id = %document.trace_id,
            segment_id = %document.id,
            segment = %json,
            "Segment emitted"
        );
        Ok(())
    }
}

/// Drops every document.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopEmitter;

impl Emitter for NoopEmitter {
    fn emit(&self, _document: &SegmentDocument) -> Result<(), EmitError> {
        Ok(())
    }
}

/// Queues documents on an unbounded channel.
#[derive(Debug, Clone)]
pub struct ChannelEmitter {
    tx: mpsc::UnboundedSender<SegmentDocument>,
}

impl ChannelEmitter {
    /// Create an emitter together with the receiver for its documents.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<SegmentDocument>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl Emitter for ChannelEmitter {
    fn emit(&self, document: &SegmentDocument) -> Result<(), EmitError> {
        self.tx.send(document.clone()).map_err(|_| EmitError::Disconnected)
    }
}

/// Build the emitter selected in configuration.
pub fn emitter_for(kind: EmitterKind) -> Arc<dyn Emitter> {
    match kind {
        EmitterKind::Log => Arc::new(LogEmitter),
        EmitterKind::None => Arc::new(NoopEmitter),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recorder::segment::{Segment, SegmentTree};

    fn document() -> SegmentDocument {
        SegmentTree::new(Segment::new("GET:/", "53995c3f42cd8ad8", "1-5759e988-bd862e3fe1be46a994272793")).document()
    }

    #[test]
    fn test_channel_emitter_delivers() {
        let (emitter, mut rx) = ChannelEmitter::new();
        emitter.emit(&document()).unwrap();
        assert_eq!(rx.try_recv().unwrap().id, "53995c3f42cd8ad8");
    }

    #[test]
    fn test_channel_emitter_disconnected() {
        let (emitter, rx) = ChannelEmitter::new();
        drop(rx);
        assert!(matches!(emitter.emit(&document()), Err(EmitError::Disconnected)));
    }

    #[test]
    fn test_log_and_noop_emitters_accept() {
        assert!(LogEmitter.emit(&document()).is_ok());
        assert!(NoopEmitter.emit(&document()).is_ok());
        assert!(emitter_for(EmitterKind::Log).emit(&document()).is_ok());
    }
}
