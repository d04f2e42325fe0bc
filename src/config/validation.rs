//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (attempts >= 1, delay > 0, status codes in range)
//! - Validate addresses before anything binds or connects
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ProxyConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use http::uri::Authority;
use http::StatusCode;

use crate::config::schema::{ProxyConfig, RetryConfig};

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("max_attempts must be >= 1 (got {0})")]
    MaxAttempts(u32),

    #[error("retry_delay must be > 0")]
    RetryDelay,

    #[error("retry_status_codes must not be empty when present")]
    EmptyStatusCodes,

    #[error("retry_status_codes contains invalid status code {0}")]
    InvalidStatusCode(u16),

    #[error("invalid bind address '{0}'")]
    BindAddress(String),

    #[error("invalid upstream address '{0}'")]
    UpstreamAddress(String),

    #[error("max_request_body_bytes must be > 0")]
    RequestBodyLimit,

    #[error("request timeout must be > 0 seconds")]
    RequestTimeout,
}

/// Validate the retry section on its own.
pub fn validate_retry(config: &RetryConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.max_attempts < 1 {
        errors.push(ValidationError::MaxAttempts(config.max_attempts));
    }

    if config.retry_delay.is_zero() {
        errors.push(ValidationError::RetryDelay);
    }

    if let Some(codes) = &config.retry_status_codes {
        if codes.is_empty() {
            errors.push(ValidationError::EmptyStatusCodes);
        }
        for &code in codes {
            if StatusCode::from_u16(code).is_err() {
                errors.push(ValidationError::InvalidStatusCode(code));
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Validate a complete proxy configuration.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = validate_retry(&config.retry).err().unwrap_or_default();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::BindAddress(
            config.listener.bind_address.clone(),
        ));
    }

    if config.upstream.address.parse::<Authority>().is_err() {
        errors.push(ValidationError::UpstreamAddress(
            config.upstream.address.clone(),
        ));
    }

    if config.upstream.max_request_body_bytes == 0 {
        errors.push(ValidationError::RequestBodyLimit);
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::RequestTimeout);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
