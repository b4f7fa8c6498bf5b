//! Trace propagation onto requests this service makes.
//!
//! # Design Decisions
//! - Outbound headers always carry `Root`, `Parent` and `Sampled`
//! - `Parent` is the id of the segment making the call, so callers should
//!   open a subsegment per downstream call and pass that handle
//! - A missing trace id is logged and sent as an empty `Root=`; the call
//!   itself is never aborted

use axum::http::{HeaderMap, HeaderValue, Request};

use crate::propagation::header::{outbound_header, X_AMZN_TRACE_ID};
use crate::recorder::handle::TraceHandle;

/// Header value for a call made on behalf of `segment`.
pub fn outbound_header_for(segment: &TraceHandle) -> String {
    let trace_id = segment.trace_id();
    if trace_id.is_empty() {
        tracing::error!(segment_id = %segment.id(), "No trace id on segment chain, propagating empty Root");
    }
    outbound_header(&trace_id, &segment.id(), segment.sampled())
}

/// Set `x-amzn-trace-id` in `headers`, replacing any existing value.
pub fn inject_trace_header(segment: &TraceHandle, headers: &mut HeaderMap) {
    let value = outbound_header_for(segment);
    match HeaderValue::from_str(&value) {
        Ok(value) => {
            headers.insert(X_AMZN_TRACE_ID, value);
        }
        Err(e) => {
            tracing::warn!(header = %value, error = %e, "Outbound trace header is not a valid header value");
        }
    }
}

/// Propagate the trace of `segment` onto an outgoing request.
pub fn trace_outgoing_request<B>(segment: &TraceHandle, request: &mut Request<B>) {
    inject_trace_header(segment, request.headers_mut());
}

/// Trace propagation for `reqwest` request builders.
pub trait TraceRequestExt {
    fn with_trace(self, segment: &TraceHandle) -> Self;
}

impl TraceRequestExt for reqwest::RequestBuilder {
    fn with_trace(self, segment: &TraceHandle) -> Self {
        self.header(X_AMZN_TRACE_ID, outbound_header_for(segment))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::propagation::header::TraceHeader;
    use crate::recorder::{NoopEmitter, Recorder};
    use axum::body::Body;
    use std::sync::Arc;

    fn recorder() -> Recorder {
        Recorder::new(Arc::new(NoopEmitter))
    }

    #[test]
    fn test_request_segment() {
        let segment = recorder().begin("Test");
        let mut req = Request::builder().method("POST").uri("/").body(Body::from("{}")).unwrap();

        trace_outgoing_request(&segment, &mut req);

        let expected = format!("Root={};Parent={};Sampled={}", segment.trace_id(), segment.id(), u8::from(segment.sampled()));
        assert_eq!(req.headers()[X_AMZN_TRACE_ID], expected.as_str());
    }

    #[test]
    fn test_subsegment_uses_root_trace_and_own_id() {
        let segment = recorder().begin("Test");
        let sub = segment.begin_subsegment("TestSubsegment");
        let mut req = Request::builder().method("POST").uri("/").body(Body::from("{}")).unwrap();

        trace_outgoing_request(&sub, &mut req);

        let expected = format!("Root={};Parent={};Sampled=1", segment.trace_id(), sub.id());
        assert_eq!(req.headers()[X_AMZN_TRACE_ID], expected.as_str());
    }

    #[test]
    fn test_unsampled_continued_trace() {
        let (segment, _) = recorder().begin_or_continue("Test", &TraceHeader::parse("Root=abc;Parent=def;Sampled=0"));
        let mut headers = HeaderMap::new();
        headers.insert(X_AMZN_TRACE_ID, HeaderValue::from_static("Root=stale"));

        inject_trace_header(&segment, &mut headers);

        let parsed = TraceHeader::from_headers(&headers);
        assert_eq!(parsed.root(), Some("abc"));
        assert_eq!(parsed.parent(), Some(segment.id().as_str()));
        assert_eq!(parsed.sampled(), Some("0"));
    }

    #[test]
    fn test_reqwest_builder() {
        let segment = recorder().begin("Test");
        let req = reqwest::Client::new()
            .get("http://127.0.0.1:1/")
            .with_trace(&segment)
            .build()
            .unwrap();
        assert_eq!(
            req.headers()[X_AMZN_TRACE_ID].to_str().unwrap(),
            outbound_header_for(&segment)
        );
    }
}
