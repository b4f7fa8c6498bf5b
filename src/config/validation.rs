//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate addresses, URLs and value ranges
//! - Check that naming options are consistent
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ServiceConfig → Result<(), Vec<ValidationError>>

use std::net::SocketAddr;
use thiserror::Error;
use url::Url;

use crate::config::schema::ServiceConfig;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("invalid {field} '{value}': not a socket address")]
    InvalidAddress { field: &'static str, value: String },

    #[error("naming.{0} must not be empty")]
    EmptyName(&'static str),

    #[error("naming.host_pattern requires naming.fixed_name as fallback")]
    PatternWithoutFallback,

    #[error("invalid downstream.url '{0}'")]
    InvalidUrl(String),

    #[error("downstream.url '{0}' must use http or https")]
    UnsupportedScheme(String),

    #[error("{0} must be greater than zero")]
    ZeroTimeout(&'static str),
}

/// Check every semantic rule and collect all failures.
pub fn validate_config(config: &ServiceConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field: "listener.bind_address",
            value: config.listener.bind_address.clone(),
        });
    }

    if config.naming.fixed_name.as_deref().is_some_and(|n| n.trim().is_empty()) {
        errors.push(ValidationError::EmptyName("fixed_name"));
    }
    match (&config.naming.fixed_name, &config.naming.host_pattern) {
        (_, Some(pattern)) if pattern.trim().is_empty() => {
            errors.push(ValidationError::EmptyName("host_pattern"));
        }
        (None, Some(_)) => errors.push(ValidationError::PatternWithoutFallback),
        _ => {}
    }

    if let Some(raw) = &config.downstream.url {
        match Url::parse(raw) {
            Ok(url) if url.scheme() == "http" || url.scheme() == "https" => {}
            Ok(_) => errors.push(ValidationError::UnsupportedScheme(raw.clone())),
            Err(_) => errors.push(ValidationError::InvalidUrl(raw.clone())),
        }
    }
    if config.downstream.timeout_secs == 0 {
        errors.push(ValidationError::ZeroTimeout("downstream.timeout_secs"));
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::ZeroTimeout("timeouts.request_secs"));
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidAddress {
            field: "observability.metrics_address",
            value: config.observability.metrics_address.clone(),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
