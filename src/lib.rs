//! AWS X-Ray trace propagation for Axum services.
//!
//! One segment per inbound request, continued from `x-amzn-trace-id` when
//! the caller sent one, answered with a trace header on the response and
//! propagated onto outbound calls through subsegments.

pub mod config;
pub mod health;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod propagation;
pub mod recorder;

pub use config::schema::ServiceConfig;
pub use http::{traced, CurrentSegment, HttpServer, TraceState};
pub use lifecycle::Shutdown;
pub use propagation::{TraceHeader, X_AMZN_TRACE_ID};
pub use recorder::{Recorder, TraceHandle};
