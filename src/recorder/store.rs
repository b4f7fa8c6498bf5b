//! Segment store: opens segments and closes them exactly once.

use std::sync::Arc;

use crate::health::HealthFlags;
use crate::observability::metrics;
use crate::propagation::continuation::{continue_trace, Continuation};
use crate::propagation::header::TraceHeader;
use crate::recorder::emitter::Emitter;
use crate::recorder::error::{TraceError, TraceResult};
use crate::recorder::handle::TraceHandle;
use crate::recorder::ids::{new_segment_id, new_trace_id};
use crate::recorder::segment::Segment;

/// Opens request segments and hands closed ones to an emitter.
#[derive(Debug, Clone)]
pub struct Recorder {
    emitter: Arc<dyn Emitter>,
}

impl Recorder {
    pub fn new(emitter: Arc<dyn Emitter>) -> Self {
        Self { emitter }
    }

    /// Open a request segment with freshly minted ids.
    pub fn begin(&self, name: impl Into<String>) -> TraceHandle {
        TraceHandle::new(Segment::new(name, new_segment_id(), new_trace_id()))
    }

    /// Open a request segment, continuing the inbound trace when the header
    /// carries one.
    pub fn begin_or_continue(&self, name: impl Into<String>, header: &TraceHeader) -> (TraceHandle, Continuation) {
        let mut segment = Segment::new(name, new_segment_id(), new_trace_id());
        let continuation = continue_trace(header, &mut segment);

        tracing::debug!(
            segment_id = %segment.id,
            trace_id = %segment.trace_id,
            parent_id = ?segment.parent_id,
            sampled = segment.sampled,
            continued = segment.request_was_traced,
            "Segment opened"
        );

        (TraceHandle::new(segment), continuation)
    }

    /// Close the segment behind `handle`.
    ///
    /// `cause` is recorded on the segment when present. Closing the request
    /// segment emits the whole tree if it is sampled. A second close returns
    /// [`TraceError::AlreadyClosed`] and emits nothing.
    pub fn close(&self, handle: &TraceHandle, cause: Option<&str>) -> TraceResult<()> {
        let document = {
            let mut tree = handle.lock();
            let segment = tree
                .get_mut(handle.index())
                .ok_or(TraceError::UnknownSegment(handle.index()))?;
            if segment.is_closed() {
                return Err(TraceError::AlreadyClosed(segment.id.clone()));
            }
            segment.mark_closed(cause);

            let flags = HealthFlags {
                error: segment.error,
                throttle: segment.throttle,
                fault: segment.fault,
            };
            let duration = segment.end_time.unwrap_or(segment.start_time) - segment.start_time;
            metrics::record_segment_closed(flags.outcome(), duration);

            tracing::debug!(
                segment_id = %segment.id,
                status = ?segment.http.response.status,
                outcome = flags.outcome(),
                "Segment closed"
            );

            if !handle.is_root() {
                return Ok(());
            }
            if !segment.sampled {
                tracing::debug!(segment_id = %segment.id, "Segment not sampled, skipping emit");
                return Ok(());
            }
            tree.document()
        };

        if let Err(e) = self.emitter.emit(&document) {
            metrics::record_emit_failure();
            return Err(e.into());
        }
        metrics::record_segment_emitted();
        Ok(())
    }
}
