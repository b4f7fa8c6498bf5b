//! Continue-or-start decision and root id resolution.

use crate::propagation::header::{response_header, TraceHeader, SAMPLED_NO, SAMPLED_UNKNOWN};
use crate::recorder::segment::Segment;

/// Upper bound on parent hops walked when resolving a trace id.
pub const MAX_CHAIN_DEPTH: usize = 64;

/// What the inbound header asked for, beyond what lands on the segment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Continuation {
    /// The caller sent `Sampled=?` and expects the decision echoed back.
    pub sampled_unknown: bool,
}

impl Continuation {
    /// Header to return to the caller for a segment with this trace id and
    /// sampling decision.
    pub fn response_header(&self, trace_id: &str, sampled: bool) -> String {
        response_header(trace_id, self.sampled_unknown, sampled)
    }
}

/// Apply an inbound header to a freshly minted segment.
///
/// A non-empty `Root` replaces the minted trace id and marks the request as
/// traced; a non-empty `Parent` becomes the parent id. The segment is
/// sampled unless `Sampled` is exactly `"0"`.
pub fn continue_trace(header: &TraceHeader, segment: &mut Segment) -> Continuation {
    if let Some(root) = header.root() {
        segment.trace_id = root.to_string();
        segment.request_was_traced = true;
    }
    if let Some(parent) = header.parent() {
        segment.parent_id = Some(parent.to_string());
    }

    let sampled = header.sampled();
    segment.sampled = sampled != Some(SAMPLED_NO);

    Continuation {
        sampled_unknown: sampled == Some(SAMPLED_UNKNOWN),
    }
}

/// First non-empty trace id found walking from `index` up through parent
/// segments. Returns `""` when nothing on the chain carries one.
pub fn resolve_trace_id(segments: &[Segment], index: usize) -> &str {
    let mut index = index;
    for _ in 0..=MAX_CHAIN_DEPTH {
        let Some(segment) = segments.get(index) else {
            break;
        };
        if !segment.trace_id.is_empty() {
            return &segment.trace_id;
        }
        match segment.parent_index() {
            Some(parent) if parent < index => index = parent,
            _ => break,
        }
    }
    ""
}
