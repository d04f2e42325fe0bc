//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router forwarding every path to the backend
//! - Wire up middleware (retry, tracing)
//! - Bind server to listener
//! - Stop when the shutdown signal fires
//!
//! # Layer Order
//! ```text
//! TraceLayer → RetryLayer → forward_handler
//! ```
//! `timeouts.request_secs` bounds each forwarded attempt inside the forwarder,
//! so a slow backend shows up as a `504` the retry policy can act on.

use std::time::Duration;

use axum::{routing::any, Router};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::trace::TraceLayer;

use crate::config::{ConfigError, ProxyConfig, ValidationError};
use crate::config::validation::validate_config;
use crate::http::forward::{forward_handler, Forwarder};
use crate::resilience::RetryLayer;

/// HTTP server for the retrying proxy.
pub struct HttpServer {
    router: Router,
    config: ProxyConfig,
}

impl HttpServer {
    /// Create a new HTTP server, validating the configuration.
    pub fn new(config: ProxyConfig) -> Result<Self, ConfigError> {
        validate_config(&config).map_err(ConfigError::Validation)?;

        let attempt_timeout = Duration::from_secs(config.timeouts.request_secs);
        let forwarder = Forwarder::new(&config.upstream.address, attempt_timeout).map_err(|_| {
            ConfigError::Validation(vec![ValidationError::UpstreamAddress(
                config.upstream.address.clone(),
            )])
        })?;
        let retry = RetryLayer::new(&config.retry)?
            .with_body_limit(config.upstream.max_request_body_bytes);

        let router = Self::build_router(forwarder, retry);
        Ok(Self { router, config })
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(forwarder: Forwarder, retry: RetryLayer) -> Router {
        Router::new()
            .route("/{*path}", any(forward_handler))
            .route("/", any(forward_handler))
            .with_state(forwarder)
            .layer(retry)
            .layer(TraceLayer::new_for_http())
    }

    /// Run the server until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            upstream = %self.config.upstream.address,
            max_attempts = self.config.retry.max_attempts,
            retry_delay = ?self.config.retry.retry_delay,
            "HTTP server starting"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Draining in-flight requests");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }

    /// The router, for serving it elsewhere or driving it in tests.
    pub fn into_router(self) -> Router {
        self.router
    }
}
