//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the proxy.
//! All types derive Serde traits for deserialization from config files.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root configuration for the retrying proxy.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ProxyConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Backend the proxy forwards to.
    pub upstream: UpstreamConfig,

    /// Retry policy applied to every request.
    pub retry: RetryConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Upstream backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Backend authority (e.g., "127.0.0.1:3000").
    pub address: String,

    /// Largest request body buffered for replay, in bytes.
    pub max_request_body_bytes: usize,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1:3000".to_string(),
            max_request_body_bytes: 2 * 1024 * 1024, // 2MB
        }
    }
}

/// Retry configuration.
///
/// Field aliases accept the camelCase names used by JSON plugin configs.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Instance name used in logs and metrics.
    pub name: String,

    /// Total number of upstream invocations per request.
    #[serde(alias = "maxRetries", alias = "maxAttempts", alias = "max_retries")]
    pub max_attempts: u32,

    /// Fixed wait between attempts. Milliseconds or a string like "2s".
    #[serde(alias = "retryDelay", with = "crate::config::duration")]
    pub retry_delay: Duration,

    /// Status codes that trigger a retry. When absent, any 5xx does.
    #[serde(alias = "retryStatusCodes", skip_serializing_if = "Option::is_none")]
    pub retry_status_codes: Option<Vec<u16>>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            name: "lazy-retry".to_string(),
            max_attempts: 3,
            retry_delay: Duration::from_secs(2),
            retry_status_codes: None,
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Timeout in seconds for each forwarded attempt. Retries and delays are
    /// not counted against it.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
