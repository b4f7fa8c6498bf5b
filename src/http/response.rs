//! Response attribute capture.
//!
//! # Responsibilities
//! - Attach the trace header to the outgoing response
//! - Read the response body size when it is known up front
//! - Record status, body size and health flags on a segment
//!
//! # Design Decisions
//! - A trace header the handler set itself is left alone
//! - Bodies without an exact size hint are measured as they are sent

use axum::{
    body::HttpBody,
    http::{HeaderValue, StatusCode},
    response::Response,
};

use crate::health::HealthFlags;
use crate::propagation::header::X_AMZN_TRACE_ID;
use crate::recorder::handle::TraceHandle;

/// Set the trace header unless the handler already did.
pub fn attach_trace_header(response: &mut Response, value: &str) {
    match HeaderValue::from_str(value) {
        Ok(value) => {
            response.headers_mut().entry(X_AMZN_TRACE_ID).or_insert(value);
        }
        Err(e) => {
            tracing::warn!(header = %value, error = %e, "Trace header is not a valid header value");
        }
    }
}

/// Size of the response body in bytes, if the body knows it exactly.
pub fn exact_content_length(response: &Response) -> Option<u64> {
    response.body().size_hint().exact()
}

/// Record the final status and health flags on `segment`.
pub fn record_status(segment: &TraceHandle, status: StatusCode) {
    segment.update(|s| {
        s.http.response.status = Some(status.as_u16());
        s.set_health(HealthFlags::from(status));
    });
}

pub fn record_content_length(segment: &TraceHandle, content_length: u64) {
    segment.update(|s| s.http.response.content_length = content_length);
}

/// Record the final status, body size and health flags on `segment`.
pub fn record_response(segment: &TraceHandle, status: StatusCode, content_length: u64) {
    record_status(segment, status);
    record_content_length(segment, content_length);
}
