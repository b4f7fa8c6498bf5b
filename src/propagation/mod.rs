//! Trace-context propagation.
//!
//! # Data Flow
//! ```text
//! inbound x-amzn-trace-id
//!     → header.rs (parse into TraceHeader)
//!     → continuation.rs (continue or keep minted ids, resolve Sampled)
//!     → header.rs (serialize response / outbound header)
//! ```
//!
//! # Design Decisions
//! - Malformed headers are tolerated, never rejected
//! - Sampling is forwarded, never decided here
//! - Anything but a literal "0" counts as sampled

pub mod continuation;
pub mod header;

pub use continuation::{continue_trace, resolve_trace_id, Continuation};
pub use header::{outbound_header, response_header, TraceHeader, X_AMZN_TRACE_ID};
