//! Shared handle to a segment inside its request's tree.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::recorder::ids::new_segment_id;
use crate::recorder::segment::{Segment, SegmentDocument, SegmentTree, ROOT_INDEX};

/// Handle to one segment of a request's segment tree.
///
/// Clones refer to the same record. Every access takes the tree's lock for
/// the duration of a single read or field-group write.
#[derive(Debug, Clone)]
pub struct TraceHandle {
    tree: Arc<Mutex<SegmentTree>>,
    index: usize,
}

impl TraceHandle {
    /// Open a new tree with `root` as the request segment.
    pub(crate) fn new(root: Segment) -> Self {
        Self {
            tree: Arc::new(Mutex::new(SegmentTree::new(root))),
            index: ROOT_INDEX,
        }
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, SegmentTree> {
        self.tree.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// True for the request segment, false for subsegments.
    pub fn is_root(&self) -> bool {
        self.index == ROOT_INDEX
    }

    /// True if both handles point at the same segment of the same tree.
    pub fn same_record(&self, other: &TraceHandle) -> bool {
        Arc::ptr_eq(&self.tree, &other.tree) && self.index == other.index
    }

    /// Read from the segment under the lock.
    pub fn read<R>(&self, f: impl FnOnce(&Segment) -> R) -> Option<R> {
        self.lock().get(self.index).map(f)
    }

    /// Mutate the segment under the lock.
    ///
    /// Returns false, leaving the segment untouched, once it is closed.
    pub fn update(&self, f: impl FnOnce(&mut Segment)) -> bool {
        let mut tree = self.lock();
        let Some(segment) = tree.get_mut(self.index) else {
            return false;
        };
        if segment.is_closed() {
            tracing::warn!(segment_id = %segment.id, "Ignoring update to closed segment");
            return false;
        }
        f(segment);
        true
    }

    /// Copy of the segment as it is right now.
    pub fn snapshot(&self) -> Option<Segment> {
        self.read(Segment::clone)
    }

    pub fn id(&self) -> String {
        self.read(|s| s.id.clone()).unwrap_or_default()
    }

    /// Effective trace id, walking up to the nearest ancestor that has one.
    pub fn trace_id(&self) -> String {
        self.lock().trace_id(self.index).to_string()
    }

    pub fn sampled(&self) -> bool {
        self.read(|s| s.sampled).unwrap_or(false)
    }

    pub fn is_closed(&self) -> bool {
        self.read(Segment::is_closed).unwrap_or(true)
    }

    /// Start a subsegment under this segment. It inherits the sampling
    /// decision and resolves its trace id through this segment.
    pub fn begin_subsegment(&self, name: impl Into<String>) -> TraceHandle {
        let mut tree = self.lock();
        // Handles only exist for valid indices.
        let parent = if tree.get(self.index).is_some() { self.index } else { ROOT_INDEX };
        let mut subsegment = Segment::new(name, new_segment_id(), "");
        subsegment.sampled = tree.get(parent).map(|s| s.sampled).unwrap_or(false);

        let index = tree.push_child(parent, subsegment).unwrap_or(ROOT_INDEX);

        TraceHandle {
            tree: Arc::clone(&self.tree),
            index,
        }
    }

    /// Document for the whole tree this handle belongs to.
    pub fn document(&self) -> SegmentDocument {
        self.lock().document()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handle() -> TraceHandle {
        TraceHandle::new(Segment::new("GET:/", "53995c3f42cd8ad8", "1-5759e988-bd862e3fe1be46a994272793"))
    }

    #[test]
    fn test_clones_share_the_record() {
        let handle = handle();
        let clone = handle.clone();
        assert!(clone.same_record(&handle));

        clone.update(|s| s.http.request.method = "GET".into());
        assert_eq!(handle.read(|s| s.http.request.method.clone()).unwrap(), "GET");
    }

    #[test]
    fn test_subsegment_resolves_trace_id() {
        let handle = handle();
        let sub = handle.begin_subsegment("downstream");
        let nested = sub.begin_subsegment("dns");

        assert!(!sub.is_root());
        assert!(!sub.same_record(&handle));
        assert_eq!(nested.trace_id(), "1-5759e988-bd862e3fe1be46a994272793");
        assert_eq!(nested.read(|s| s.trace_id.clone()).unwrap(), "");
        assert_ne!(nested.id(), sub.id());
    }

    #[test]
    fn test_subsegment_inherits_sampling() {
        let handle = handle();
        handle.update(|s| s.sampled = false);
        assert!(!handle.begin_subsegment("db").sampled());
    }

    #[test]
    fn test_update_after_close_is_rejected() {
        let handle = handle();
        handle.lock().get_mut(ROOT_INDEX).unwrap().mark_closed(None);

        assert!(handle.is_closed());
        assert!(!handle.update(|s| s.fault = true));
        assert!(!handle.snapshot().unwrap().fault);
    }
}
