//! Finishing a request segment.
//!
//! `CloseGuard` closes the segment exactly once. When the response body is
//! not sized up front the guard rides inside `TracedBody`, which counts the
//! bytes handed to the connection and closes the segment at end of stream,
//! on a body error, or when the body is dropped.

use axum::body::{Body, Bytes};
use axum::http::StatusCode;
use http_body::{Body as HttpBody, Frame, SizeHint};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use crate::health::HealthFlags;
use crate::http::response::record_content_length;
use crate::recorder::handle::TraceHandle;
use crate::recorder::store::Recorder;

/// Closes the segment exactly once, including when the request future is
/// dropped before the handler returns.
pub(crate) struct CloseGuard {
    recorder: Arc<Recorder>,
    segment: TraceHandle,
    cause: Option<String>,
    closed: bool,
}

impl CloseGuard {
    pub(crate) fn new(recorder: Arc<Recorder>, segment: TraceHandle) -> Self {
        Self {
            recorder,
            segment,
            cause: None,
            closed: false,
        }
    }

    pub(crate) fn set_cause(&mut self, cause: impl Into<String>) {
        self.cause = Some(cause.into());
    }

    pub(crate) fn segment(&self) -> &TraceHandle {
        &self.segment
    }

    pub(crate) fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        if let Err(e) = self.recorder.close(&self.segment, self.cause.as_deref()) {
            tracing::warn!(segment_id = %self.segment.id(), error = %e, "Failed to close segment");
        }
    }
}

impl Drop for CloseGuard {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        self.segment.update(|s| {
            if s.http.response.status.is_none() {
                s.http.response.status = Some(StatusCode::INTERNAL_SERVER_ERROR.as_u16());
                s.set_health(HealthFlags::from(StatusCode::INTERNAL_SERVER_ERROR));
            }
        });
        self.cause
            .get_or_insert_with(|| "request dropped before completion".to_string());
        self.close();
    }
}

/// Response body that records its size on the segment and closes it once
/// the body is done.
pub(crate) struct TracedBody {
    inner: Body,
    guard: Option<CloseGuard>,
    bytes: u64,
}

impl TracedBody {
    pub(crate) fn new(inner: Body, guard: CloseGuard) -> Self {
        Self {
            inner,
            guard: Some(guard),
            bytes: 0,
        }
    }

    fn finish(&mut self, cause: Option<String>) {
        let Some(mut guard) = self.guard.take() else {
            return;
        };
        record_content_length(guard.segment(), self.bytes);
        if let Some(cause) = cause {
            guard.set_cause(cause);
        }
        guard.close();
    }
}

impl HttpBody for TracedBody {
    type Data = Bytes;
    type Error = axum::Error;

    fn poll_frame(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Result<Frame<Bytes>, axum::Error>>> {
        let this = &mut *self;
        let polled = Pin::new(&mut this.inner).poll_frame(cx);
        match &polled {
            Poll::Ready(Some(Ok(frame))) => {
                if let Some(data) = frame.data_ref() {
                    this.bytes += data.len() as u64;
                }
                if this.inner.is_end_stream() {
                    this.finish(None);
                }
            }
            Poll::Ready(Some(Err(e))) => {
                tracing::warn!(error = %e, "Response body failed");
                this.finish(Some(format!("response body failed: {}", e)));
            }
            Poll::Ready(None) => this.finish(None),
            Poll::Pending => {}
        }
        polled
    }

    fn is_end_stream(&self) -> bool {
        self.inner.is_end_stream()
    }

    fn size_hint(&self) -> SizeHint {
        self.inner.size_hint()
    }
}

impl Drop for TracedBody {
    fn drop(&mut self) {
        let cause = (!self.inner.is_end_stream()).then(|| "response body dropped before completion".to_string());
        self.finish(cause);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recorder::emitter::NoopEmitter;
    use futures_util::stream;

    fn open() -> (Arc<Recorder>, TraceHandle) {
        let recorder = Arc::new(Recorder::new(Arc::new(NoopEmitter)));
        let segment = recorder.begin("GET:/");
        (recorder, segment)
    }

    fn chunks(parts: &'static [&'static str]) -> Body {
        Body::from_stream(stream::iter(parts.iter().map(|p| Ok::<_, std::io::Error>(*p))))
    }

    #[test]
    fn test_guard_drop_closes_with_fault() {
        let (recorder, segment) = open();
        drop(CloseGuard::new(recorder, segment.clone()));

        let snapshot = segment.snapshot().unwrap();
        assert!(snapshot.is_closed());
        assert_eq!(snapshot.http.response.status, Some(500));
        assert!(snapshot.fault);
        assert_eq!(snapshot.cause.as_deref(), Some("request dropped before completion"));
    }

    #[tokio::test]
    async fn test_body_counts_bytes_and_closes_at_end() {
        let (recorder, segment) = open();
        let body = TracedBody::new(chunks(&["ab", "cd", "e"]), CloseGuard::new(recorder, segment.clone()));

        let bytes = axum::body::to_bytes(Body::new(body), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"abcde");

        let snapshot = segment.snapshot().unwrap();
        assert!(snapshot.is_closed());
        assert_eq!(snapshot.http.response.content_length, 5);
        assert_eq!(snapshot.cause, None);
    }

    #[test]
    fn test_body_dropped_unread_closes_with_cause() {
        let (recorder, segment) = open();
        segment.update(|s| s.http.response.status = Some(200));
        drop(TracedBody::new(chunks(&["ab"]), CloseGuard::new(recorder, segment.clone())));

        let snapshot = segment.snapshot().unwrap();
        assert!(snapshot.is_closed());
        assert_eq!(snapshot.http.response.status, Some(200));
        assert_eq!(snapshot.http.response.content_length, 0);
        assert!(!snapshot.fault);
        assert_eq!(snapshot.cause.as_deref(), Some("response body dropped before completion"));
    }
}
