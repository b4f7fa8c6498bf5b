//! HTTP middleware.

pub mod extract;
mod guard;
pub mod segment;

pub use extract::{CurrentSegment, MissingSegment};
pub use segment::{trace_segment, TraceState};

use axum::{middleware::from_fn_with_state, Router};

/// Wrap every route of `router` with the segment middleware.
pub fn traced<S>(router: Router<S>, state: TraceState) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    router.layer(from_fn_with_state(state, trace_segment))
}
