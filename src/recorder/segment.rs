//! Segment records and the per-request segment tree.
//!
//! # Design Decisions
//! - A request owns one `SegmentTree`; index 0 is the request segment
//! - Subsegments point at their parent by index, parents always precede
//!   children in the arena, so walking up the chain strictly decreases
//! - The emitted document follows the X-Ray segment document field names

use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::health::HealthFlags;
use crate::propagation::continuation::resolve_trace_id;

/// Index of the request segment inside its tree.
pub const ROOT_INDEX: usize = 0;

/// Request attributes captured before the handler runs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpRequestData {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub method: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub url: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub client_ip: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub user_agent: String,
    #[serde(default, skip_serializing_if = "is_false")]
    pub x_forwarded_for: bool,
}

/// Response attributes captured after the handler returns.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpResponseData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(default)]
    pub content_length: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpData {
    #[serde(default)]
    pub request: HttpRequestData,
    #[serde(default)]
    pub response: HttpResponseData,
}

impl HttpData {
    pub fn is_empty(&self) -> bool {
        *self == HttpData::default()
    }
}

/// One trace record: the request segment or a subsegment of it.
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    pub name: String,
    /// Span id, unique per segment.
    pub id: String,
    /// Empty on subsegments; resolved through the parent chain.
    pub trace_id: String,
    pub parent_id: Option<String>,
    pub sampled: bool,
    /// True only when an inbound `Root` was honored.
    pub request_was_traced: bool,
    pub start_time: f64,
    pub end_time: Option<f64>,
    pub http: HttpData,
    pub error: bool,
    pub throttle: bool,
    pub fault: bool,
    pub cause: Option<String>,
    parent: Option<usize>,
    closed: bool,
}

impl Segment {
    /// Create an open segment starting now.
    pub fn new(name: impl Into<String>, id: impl Into<String>, trace_id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id: id.into(),
            trace_id: trace_id.into(),
            parent_id: None,
            sampled: true,
            request_was_traced: false,
            start_time: epoch_seconds(),
            end_time: None,
            http: HttpData::default(),
            error: false,
            throttle: false,
            fault: false,
            cause: None,
            parent: None,
            closed: false,
        }
    }

    /// Index of the in-process parent segment, `None` for the request segment.
    pub fn parent_index(&self) -> Option<usize> {
        self.parent
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn set_health(&mut self, flags: HealthFlags) {
        self.error = flags.error;
        self.throttle = flags.throttle;
        self.fault = flags.fault;
    }

    pub(crate) fn mark_closed(&mut self, cause: Option<&str>) {
        self.end_time = Some(epoch_seconds());
        if let Some(cause) = cause {
            self.cause = Some(cause.to_string());
        }
        self.closed = true;
    }
}

/// Arena of all segments recorded for one request.
#[derive(Debug)]
pub struct SegmentTree {
    segments: Vec<Segment>,
}

impl SegmentTree {
    pub fn new(mut root: Segment) -> Self {
        root.parent = None;
        Self {
            segments: vec![root],
        }
    }

    pub fn get(&self, index: usize) -> Option<&Segment> {
        self.segments.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut Segment> {
        self.segments.get_mut(index)
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Attach `segment` under `parent`. Returns the new index, or `None` if
    /// the parent does not exist.
    pub fn push_child(&mut self, parent: usize, mut segment: Segment) -> Option<usize> {
        if parent >= self.segments.len() {
            return None;
        }
        segment.parent = Some(parent);
        self.segments.push(segment);
        Some(self.segments.len() - 1)
    }

    /// Effective trace id for the segment at `index`.
    pub fn trace_id(&self, index: usize) -> &str {
        resolve_trace_id(&self.segments, index)
    }

    /// Build the document for the request segment with subsegments nested.
    ///
    /// Children always sit at higher indices than their parent, so building
    /// from the last index down finishes every child before its parent.
    pub fn document(&self) -> SegmentDocument {
        let mut children = vec![Vec::new(); self.segments.len()];
        for (index, segment) in self.segments.iter().enumerate() {
            if let Some(parent) = segment.parent {
                children[parent].push(index);
            }
        }

        let mut built: Vec<Option<SegmentDocument>> = vec![None; self.segments.len()];
        for index in (ROOT_INDEX + 1..self.segments.len()).rev() {
            let subsegments = take_built(&mut built, &children[index]);
            built[index] = Some(self.segment_document(index, subsegments));
        }
        let subsegments = take_built(&mut built, &children[ROOT_INDEX]);
        self.segment_document(ROOT_INDEX, subsegments)
    }

    fn segment_document(&self, index: usize, subsegments: Vec<SegmentDocument>) -> SegmentDocument {
        let segment = &self.segments[index];
        SegmentDocument {
            name: segment.name.clone(),
            id: segment.id.clone(),
            trace_id: if index == ROOT_INDEX { segment.trace_id.clone() } else { String::new() },
            parent_id: segment.parent_id.clone(),
            start_time: segment.start_time,
            end_time: segment.end_time,
            in_progress: !segment.closed,
            http: segment.http.clone(),
            error: segment.error,
            throttle: segment.throttle,
            fault: segment.fault,
            cause: segment.cause.clone(),
            subsegments,
        }
    }
}

fn take_built(built: &mut [Option<SegmentDocument>], indices: &[usize]) -> Vec<SegmentDocument> {
    indices.iter().filter_map(|&index| built[index].take()).collect()
}

/// Serialized form of a finished segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentDocument {
    pub name: String,
    pub id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub trace_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    pub start_time: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<f64>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub in_progress: bool,
    #[serde(default, skip_serializing_if = "HttpData::is_empty")]
    pub http: HttpData,
    #[serde(default, skip_serializing_if = "is_false")]
    pub error: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub throttle: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub fault: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cause: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub subsegments: Vec<SegmentDocument>,
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// Seconds since the Unix epoch with sub-second precision.
pub fn epoch_seconds() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs_f64()
}
