//! Segment recorder.
//!
//! # Data Flow
//! ```text
//! middleware
//!     → store.rs (mint ids, continue inbound trace, open segment tree)
//!     → handle.rs (TraceHandle shared with handlers via request extensions)
//!     → handlers add subsegments / read the segment
//!     → store.rs close (exactly once per segment)
//!     → emitter.rs (log / channel / discard the finished document)
//! ```
//!
//! # Design Decisions
//! - One segment tree per request, never shared across requests
//! - Closing the request segment emits the whole tree as one document
//! - Unsampled segments are closed but not emitted
//! - Emission is fire-and-forget; nothing here waits on I/O

pub mod emitter;
pub mod error;
pub mod handle;
pub mod ids;
pub mod naming;
pub mod segment;
pub mod store;

pub use emitter::{ChannelEmitter, Emitter, LogEmitter, NoopEmitter};
pub use error::{EmitError, TraceError};
pub use handle::TraceHandle;
pub use naming::{DynamicSegmentNamer, FixedSegmentNamer, SegmentNamer};
pub use segment::{Segment, SegmentDocument, SegmentTree};
pub use store::Recorder;
