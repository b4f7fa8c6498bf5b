//! `x-amzn-trace-id` header codec.
//!
//! # Grammar
//! ```text
//! header := pair (";" pair)*
//! pair   := key "=" value
//! ```
//!
//! # Design Decisions
//! - Parsing never fails: any input produces a mapping
//! - Only the first `=` splits a pair
//! - The response header never carries `Parent`

use std::collections::HashMap;
use std::convert::Infallible;
use std::str::FromStr;

use axum::http::HeaderMap;

/// Name of the trace header (lowercase, matched case-insensitively).
pub const X_AMZN_TRACE_ID: &str = "x-amzn-trace-id";

pub const ROOT_KEY: &str = "Root";
pub const PARENT_KEY: &str = "Parent";
pub const SAMPLED_KEY: &str = "Sampled";

/// Sampled value meaning "decision deferred to the callee".
pub const SAMPLED_UNKNOWN: &str = "?";

/// Sampled value meaning "do not sample".
pub const SAMPLED_NO: &str = "0";

/// Parsed trace header.
///
/// Unknown keys are kept so that callers can inspect them, but nothing in
/// the propagation path reads them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TraceHeader {
    fields: HashMap<String, String>,
}

impl TraceHeader {
    /// Parse a raw header value.
    pub fn parse(raw: &str) -> Self {
        let mut fields = HashMap::new();
        for pair in raw.split(';') {
            let (key, value) = match pair.split_once('=') {
                Some((k, v)) => (k.trim(), v.trim()),
                None => (pair.trim(), ""),
            };
            fields.insert(key.to_string(), value.to_string());
        }
        Self { fields }
    }

    /// Parse the trace header out of a request's headers.
    /// A missing or non-ASCII header parses as the empty string.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let raw = headers
            .get(X_AMZN_TRACE_ID)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        Self::parse(raw)
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    /// Non-empty `Root` value.
    pub fn root(&self) -> Option<&str> {
        self.get(ROOT_KEY).filter(|v| !v.is_empty())
    }

    /// Non-empty `Parent` value.
    pub fn parent(&self) -> Option<&str> {
        self.get(PARENT_KEY).filter(|v| !v.is_empty())
    }

    /// Raw `Sampled` value, if the key was present at all.
    pub fn sampled(&self) -> Option<&str> {
        self.get(SAMPLED_KEY)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl FromStr for TraceHeader {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

/// Header sent back to the caller: `Root=<id>[;Sampled=<0|1>]`.
///
/// `Sampled` is echoed only when the caller deferred the decision with `?`.
pub fn response_header(trace_id: &str, sampled_unknown: bool, sampled: bool) -> String {
    let mut header = format!("{}={}", ROOT_KEY, trace_id);
    if sampled_unknown {
        header.push_str(&format!(";{}={}", SAMPLED_KEY, sampled_digit(sampled)));
    }
    header
}

/// Header sent on calls this service makes: `Root=<id>;Parent=<id>;Sampled=<0|1>`.
pub fn outbound_header(trace_id: &str, parent_id: &str, sampled: bool) -> String {
    format!(
        "{}={};{}={};{}={}",
        ROOT_KEY,
        trace_id,
        PARENT_KEY,
        parent_id,
        SAMPLED_KEY,
        sampled_digit(sampled)
    )
}

fn sampled_digit(sampled: bool) -> u8 {
    u8::from(sampled)
}
