//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the demo handlers
//! - Wire up middleware (request logging, segment tracing, timeout)
//! - Bind server to listener with graceful shutdown
//! - Forward `/downstream` calls with the trace header propagated

use axum::{
    body::Body,
    extract::{Path, State},
    http::{Request, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};
use url::Url;

use crate::config::{NamingConfig, ServiceConfig};
use crate::http::middleware::{traced, CurrentSegment, TraceState};
use crate::http::outgoing::trace_outgoing_request;
use crate::http::response::record_response;
use crate::recorder::emitter::emitter_for;
use crate::recorder::handle::TraceHandle;
use crate::recorder::naming::{DynamicSegmentNamer, FixedSegmentNamer, SegmentNamer};
use crate::recorder::segment::HttpRequestData;
use crate::recorder::store::Recorder;

const DOWNSTREAM_PREFIX: &str = "/downstream";

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub recorder: Arc<Recorder>,
    pub client: Client<HttpConnector, Body>,
    pub downstream: Option<Url>,
    pub downstream_timeout: Duration,
}

/// HTTP server for the traced service.
pub struct HttpServer {
    router: Router,
    config: ServiceConfig,
}

impl HttpServer {
    /// Create a new HTTP server emitting segments as configured.
    pub fn new(config: ServiceConfig) -> Self {
        let recorder = Recorder::new(emitter_for(config.recorder.emitter));
        Self::with_recorder(config, recorder)
    }

    /// Create a new HTTP server with an explicit recorder.
    pub fn with_recorder(config: ServiceConfig, recorder: Recorder) -> Self {
        let mut trace_state = TraceState::new(recorder);
        if let Some(namer) = namer_for(&config.naming) {
            trace_state = trace_state.with_namer(namer);
        }

        let downstream = config.downstream.url.as_deref().and_then(|raw| match Url::parse(raw) {
            Ok(url) => Some(url),
            Err(e) => {
                tracing::error!(url = %raw, error = %e, "Ignoring invalid downstream URL");
                None
            }
        });

        let state = AppState {
            recorder: Arc::clone(trace_state.recorder()),
            client: Client::builder(TokioExecutor::new()).build(HttpConnector::new()),
            downstream,
            downstream_timeout: Duration::from_secs(config.downstream.timeout_secs),
        };

        let router = Self::build_router(&config, trace_state, state);
        Self { router, config }
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(config: &ServiceConfig, trace_state: TraceState, state: AppState) -> Router {
        let routes = Router::new()
            .route("/", any(root_handler))
            .route("/status/{code}", any(status_handler))
            .route(DOWNSTREAM_PREFIX, any(downstream_handler))
            .route("/downstream/{*path}", any(downstream_handler))
            .with_state(state)
            .layer(timeout_layer(config));

        traced(routes, trace_state).layer(TraceLayer::new_for_http())
    }

    /// Router with all layers applied, for in-process use.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server until `shutdown` fires.
    pub async fn run(self, listener: TcpListener, mut shutdown: broadcast::Receiver<()>) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }
}

/// Requests running past `timeouts.request_secs` get a 408.
fn timeout_layer(config: &ServiceConfig) -> TimeoutLayer {
    TimeoutLayer::with_status_code(
        StatusCode::REQUEST_TIMEOUT,
        Duration::from_secs(config.timeouts.request_secs),
    )
}

/// Build the configured segment namer, if any.
pub fn namer_for(config: &NamingConfig) -> Option<Arc<dyn SegmentNamer>> {
    match (&config.fixed_name, &config.host_pattern) {
        (Some(fixed), Some(pattern)) => Some(Arc::new(DynamicSegmentNamer::new(fixed.clone(), pattern.clone()))),
        (Some(fixed), None) => Some(Arc::new(FixedSegmentNamer::new(fixed.clone()))),
        (None, _) => None,
    }
}

async fn root_handler() -> &'static str {
    "OK."
}

/// Respond with the requested status code and its reason phrase.
async fn status_handler(Path(code): Path<u16>) -> Response {
    match StatusCode::from_u16(code) {
        Ok(status) => (status, status.canonical_reason().unwrap_or_default()).into_response(),
        Err(_) => (StatusCode::BAD_REQUEST, "Invalid status code").into_response(),
    }
}

/// Forward the request to the downstream service under a subsegment.
async fn downstream_handler(
    State(state): State<AppState>,
    CurrentSegment(segment): CurrentSegment,
    request: Request<Body>,
) -> Response {
    let Some(base) = &state.downstream else {
        return (StatusCode::NOT_FOUND, "No downstream configured").into_response();
    };

    let path = request
        .uri()
        .path()
        .strip_prefix(DOWNSTREAM_PREFIX)
        .filter(|p| !p.is_empty())
        .unwrap_or("/");
    let target = match base.join(path).map(|url| url.as_str().parse::<Uri>()) {
        Ok(Ok(uri)) => uri,
        _ => {
            tracing::warn!(base = %base, path = %path, "Cannot build downstream URI");
            return (StatusCode::BAD_REQUEST, "Invalid downstream path").into_response();
        }
    };

    let subsegment = segment.begin_subsegment(base.host_str().unwrap_or("downstream"));
    let method = request.method().clone();

    let mut outbound = match Request::builder()
        .method(method.clone())
        .uri(target.clone())
        .body(request.into_body())
    {
        Ok(req) => req,
        Err(e) => {
            close_subsegment(&state, &subsegment, Some(&e.to_string()));
            return (StatusCode::INTERNAL_SERVER_ERROR, "Failed to build downstream request").into_response();
        }
    };
    trace_outgoing_request(&subsegment, &mut outbound);
    subsegment.update(|s| {
        s.http.request = HttpRequestData {
            method: method.to_string(),
            url: target.to_string(),
            ..HttpRequestData::default()
        }
    });

    match tokio::time::timeout(state.downstream_timeout, state.client.request(outbound)).await {
        Ok(Ok(response)) => {
            let status = response.status();
            let length = response
                .headers()
                .get(axum::http::header::CONTENT_LENGTH)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok())
                .unwrap_or(0);
            record_response(&subsegment, status, length);
            close_subsegment(&state, &subsegment, None);

            let (parts, body) = response.into_parts();
            Response::from_parts(parts, Body::new(body))
        }
        Ok(Err(e)) => {
            tracing::error!(uri = %target, error = %e, "Downstream error");
            record_response(&subsegment, StatusCode::BAD_GATEWAY, 0);
            close_subsegment(&state, &subsegment, Some(&e.to_string()));
            (StatusCode::BAD_GATEWAY, "Downstream request failed").into_response()
        }
        Err(_) => {
            tracing::error!(uri = %target, timeout = ?state.downstream_timeout, "Downstream timed out");
            record_response(&subsegment, StatusCode::GATEWAY_TIMEOUT, 0);
            close_subsegment(&state, &subsegment, Some("downstream timed out"));
            (StatusCode::GATEWAY_TIMEOUT, "Downstream request timed out").into_response()
        }
    }
}

fn close_subsegment(state: &AppState, subsegment: &TraceHandle, cause: Option<&str>) {
    if let Err(e) = state.recorder.close(subsegment, cause) {
        tracing::warn!(segment_id = %subsegment.id(), error = %e, "Failed to close subsegment");
    }
}
