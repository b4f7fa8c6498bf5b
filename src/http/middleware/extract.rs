//! Axum extractor for the request's segment.

use axum::{
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
};

use crate::recorder::handle::TraceHandle;

/// The segment the middleware opened for this request.
///
/// Holds a handle to the same record the middleware closes, so updates made
/// by the handler show up in the emitted document.
pub struct CurrentSegment(pub TraceHandle);

/// Rejection when the segment middleware is not installed on the route.
#[derive(Debug)]
pub struct MissingSegment;

impl IntoResponse for MissingSegment {
    fn into_response(self) -> Response {
        (StatusCode::INTERNAL_SERVER_ERROR, "Trace segment middleware not installed").into_response()
    }
}

impl<S: Send + Sync> FromRequestParts<S> for CurrentSegment {
    type Rejection = MissingSegment;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<TraceHandle>()
            .cloned()
            .map(CurrentSegment)
            .ok_or(MissingSegment)
    }
}
