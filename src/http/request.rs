//! Request attribute capture.
//!
//! # Responsibilities
//! - Extract method, URL, user agent for the segment
//! - Resolve the client address (X-Forwarded-For first entry, else peer)
//! - Extract the host used for segment naming
//!
//! # Design Decisions
//! - Any non-empty X-Forwarded-For wins over the socket peer
//! - Peer address is recorded as `ip:port`, as the socket reports it

use axum::{
    body::Body,
    extract::ConnectInfo,
    http::{header, HeaderMap, Request},
};
use std::net::SocketAddr;

use crate::recorder::segment::HttpRequestData;

pub const X_FORWARDED_FOR: &str = "x-forwarded-for";

/// Client address and whether it came from X-Forwarded-For.
pub fn client_ip(headers: &HeaderMap, peer: Option<SocketAddr>) -> (String, bool) {
    let forwarded = headers
        .get(X_FORWARDED_FOR)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty());

    match forwarded {
        Some(value) => {
            let first = value.split(',').next().unwrap_or_default().trim();
            (first.to_string(), true)
        }
        None => (peer.map(|addr| addr.to_string()).unwrap_or_default(), false),
    }
}

/// Host from the Host header, else the URI authority.
pub fn request_host(req: &Request<Body>) -> String {
    req.headers()
        .get(header::HOST)
        .and_then(|h| h.to_str().ok())
        .map(str::to_string)
        .or_else(|| req.uri().host().map(str::to_string))
        .unwrap_or_default()
}

/// Snapshot the request attributes recorded on the segment.
pub fn capture_request(req: &Request<Body>) -> HttpRequestData {
    let peer = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let (client_ip, x_forwarded_for) = client_ip(req.headers(), peer);

    HttpRequestData {
        method: req.method().to_string(),
        url: req.uri().to_string(),
        client_ip,
        user_agent: req
            .headers()
            .get(header::USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string(),
        x_forwarded_for,
    }
}
