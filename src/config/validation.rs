//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeout ceiling, non-empty terminator)
//! - Check path definitions (capacity, exactly one response source)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: RouterConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::{RouterConfig, MAX_TIMEOUT_SECS};
use crate::routing::MAX_PATH_ENTRIES;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("server.timeout_secs {0} exceeds {max}", max = MAX_TIMEOUT_SECS)]
    TimeoutTooLarge(u32),
    #[error("server.terminator must not be empty")]
    EmptyTerminator,
    #[error("{0} paths configured, at most {max} allowed", max = MAX_PATH_ENTRIES)]
    TooManyPaths(usize),
    #[error("path {0:?} must set exactly one of response, body, body_file")]
    AmbiguousResponse(String),
    #[error("observability.metrics_address {0:?} is not a socket address")]
    InvalidMetricsAddress(String),
}

pub fn validate_config(config: &RouterConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.server.timeout_secs > MAX_TIMEOUT_SECS {
        errors.push(ValidationError::TimeoutTooLarge(config.server.timeout_secs));
    }
    if config.server.terminator.is_empty() {
        errors.push(ValidationError::EmptyTerminator);
    }
    if config.paths.len() > MAX_PATH_ENTRIES {
        errors.push(ValidationError::TooManyPaths(config.paths.len()));
    }
    for path in &config.paths {
        let sources = [path.response.is_some(), path.body.is_some(), path.body_file.is_some()];
        if sources.iter().filter(|set| **set).count() != 1 {
            errors.push(ValidationError::AmbiguousResponse(path.pattern.clone()));
        }
    }
    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidMetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
