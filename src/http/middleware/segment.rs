//! Segment middleware: one X-Ray segment per request.
//!
//! # Request lifecycle
//! ```text
//! Idle
//!   → HeaderParsed     parse x-amzn-trace-id
//!   → RecordOpen       continue or mint trace, handle into extensions
//!   → RequestCaptured  method, url, client ip, user agent; response header computed
//!   → HandlerRunning   next.run()
//!   → ResponseCaptured status, health flags, header attached
//!   → Closed           content length recorded, recorder.close(), exactly once
//! ```
//!
//! Responses with an exactly sized body close right away. Any other body is
//! wrapped so the segment closes once the last byte is sent, with the byte
//! count as content length. A panicking handler still reaches `Closed` with
//! status 500. If the request future is dropped mid-flight the close guard
//! finishes the segment.

use axum::{
    body::Body,
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use futures_util::FutureExt;
use std::any::Any;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use crate::http::middleware::guard::{CloseGuard, TracedBody};
use crate::http::request::{capture_request, request_host};
use crate::http::response::{attach_trace_header, exact_content_length, record_content_length, record_status};
use crate::observability::metrics;
use crate::propagation::header::TraceHeader;
use crate::recorder::naming::{method_path_name, SegmentNamer};
use crate::recorder::store::Recorder;

/// State for the segment middleware.
#[derive(Clone)]
pub struct TraceState {
    recorder: Arc<Recorder>,
    namer: Option<Arc<dyn SegmentNamer>>,
}

impl TraceState {
    pub fn new(recorder: Recorder) -> Self {
        Self {
            recorder: Arc::new(recorder),
            namer: None,
        }
    }

    /// Name segments with `namer` instead of `<METHOD>:<PATH>`.
    pub fn with_namer(mut self, namer: Arc<dyn SegmentNamer>) -> Self {
        self.namer = Some(namer);
        self
    }

    pub fn recorder(&self) -> &Arc<Recorder> {
        &self.recorder
    }

    fn segment_name(&self, req: &Request) -> String {
        match &self.namer {
            Some(namer) => namer.name(&request_host(req)),
            None => method_path_name(req.method().as_str(), req.uri().path()),
        }
    }
}

impl fmt::Debug for TraceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TraceState")
            .field("recorder", &self.recorder)
            .field("namer", &self.namer)
            .finish()
    }
}

/// Middleware function tracing a single request.
pub async fn trace_segment(State(state): State<TraceState>, mut req: Request, next: Next) -> Response {
    let start_time = Instant::now();

    let header = TraceHeader::from_headers(req.headers());
    let name = state.segment_name(&req);
    let (segment, continuation) = state.recorder.begin_or_continue(name, &header);
    req.extensions_mut().insert(segment.clone());
    let mut guard = CloseGuard::new(Arc::clone(&state.recorder), segment.clone());

    let request_data = capture_request(&req);
    let method = request_data.method.clone();
    segment.update(|s| s.http.request = request_data);
    let trace_header = continuation.response_header(&segment.trace_id(), segment.sampled());

    let mut response = match AssertUnwindSafe(next.run(req)).catch_unwind().await {
        Ok(response) => response,
        Err(panic) => {
            let message = panic_message(panic.as_ref());
            tracing::error!(segment_id = %segment.id(), panic = %message, "Handler panicked");
            guard.set_cause(format!("handler panicked: {}", message));
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    };

    attach_trace_header(&mut response, &trace_header);
    let status = response.status();
    record_status(&segment, status);
    metrics::record_request(&method, status.as_u16(), start_time);

    match exact_content_length(&response) {
        Some(length) => {
            record_content_length(&segment, length);
            guard.close();
            response
        }
        None => response.map(|body| Body::new(TracedBody::new(body, guard))),
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recorder::emitter::NoopEmitter;
    use crate::recorder::naming::FixedSegmentNamer;

    #[test]
    fn test_segment_name_default_and_namer() {
        let req = Request::builder()
            .method("POST")
            .uri("/429")
            .header("Host", "api.example.com")
            .body(Body::empty())
            .unwrap();

        let state = TraceState::new(Recorder::new(Arc::new(NoopEmitter)));
        assert_eq!(state.segment_name(&req), "POST:/429");

        let state = state.with_namer(Arc::new(FixedSegmentNamer::new("checkout")));
        assert_eq!(state.segment_name(&req), "checkout");
    }

    #[test]
    fn test_panic_message() {
        let payload: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(payload.as_ref()), "boom");
        let payload: Box<dyn Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_message(payload.as_ref()), "bang");
        let payload: Box<dyn Any + Send> = Box::new(7u8);
        assert_eq!(panic_message(payload.as_ref()), "unknown panic");
    }
}
