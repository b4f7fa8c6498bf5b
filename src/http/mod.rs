//! HTTP subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, demo routes)
//!     → middleware/segment.rs (parse header, open segment)
//!     → request.rs (method, url, client ip, user agent)
//!     → handler (CurrentSegment extractor, outgoing.rs for downstream calls)
//!     → response.rs (status, content length, x-amzn-trace-id)
//!     → Send to client
//! ```

pub mod middleware;
pub mod outgoing;
pub mod request;
pub mod response;
pub mod server;

pub use middleware::{trace_segment, traced, CurrentSegment, TraceState};
pub use outgoing::{inject_trace_header, trace_outgoing_request, TraceRequestExt};
pub use server::HttpServer;
