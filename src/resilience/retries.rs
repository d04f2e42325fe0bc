//! Retry logic.
//!
//! # Responsibilities
//! - Validate retry settings once, at construction
//! - Run the upstream against a fresh recorder per attempt
//! - Classify each captured status and replay exactly one response
//!
//! # Design Decisions
//! - Fixed delay between attempts, no backoff
//! - After the last attempt the final captured response is replayed as is,
//!   the client never sees a synthesized error
//! - The delay is a per-request `tokio::time::sleep`, other requests keep flowing
//! - Every instance logs inside its own span, so concurrent instances stay apart
//! - Non-idempotent requests are retried like any other

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use http::Request;
use tracing::{Instrument, Span};

use crate::config::{ConfigError, RetryConfig};
use crate::config::validation::validate_retry;
use crate::http::recorder::ResponseRecorder;
use crate::http::sink::ResponseSink;
use crate::http::upstream::Upstream;
use crate::observability::metrics;
use crate::resilience::policy::FailurePolicy;

/// Validated, immutable retry settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetrySettings {
    max_attempts: u32,
    retry_delay: Duration,
    policy: FailurePolicy,
}

impl RetrySettings {
    /// Validate `config` and build settings from it.
    pub fn from_config(config: &RetryConfig) -> Result<Self, ConfigError> {
        validate_retry(config).map_err(ConfigError::Validation)?;

        Ok(Self {
            max_attempts: config.max_attempts,
            retry_delay: config.retry_delay,
            policy: FailurePolicy::from_status_codes(config.retry_status_codes.as_deref()),
        })
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn retry_delay(&self) -> Duration {
        self.retry_delay
    }

    pub fn policy(&self) -> &FailurePolicy {
        &self.policy
    }
}

/// Retries an upstream until it produces a non-failing response.
pub struct RetryController<U> {
    upstream: U,
    settings: Arc<RetrySettings>,
    name: String,
    span: Span,
}

impl<U> RetryController<U> {
    /// Create a controller from settings that were already validated.
    pub fn from_settings(settings: Arc<RetrySettings>, upstream: U, name: impl Into<String>) -> Self {
        let name = name.into();
        let span = tracing::info_span!("retry", name = %name);
        Self {
            upstream,
            settings,
            name,
            span,
        }
    }

    /// Log through `span` instead of the default per-instance span.
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn settings(&self) -> &RetrySettings {
        &self.settings
    }
}

impl<U: Upstream> RetryController<U> {
    /// Create a controller, rejecting invalid retry settings.
    pub fn new(
        config: &RetryConfig,
        upstream: U,
        name: impl Into<String>,
    ) -> Result<Self, ConfigError> {
        let settings = Arc::new(RetrySettings::from_config(config)?);
        Ok(Self::from_settings(settings, upstream, name))
    }

    /// Handle one request. Exactly one response is written to `sink`.
    pub async fn handle(&self, req: Request<Bytes>, sink: &mut dyn ResponseSink) {
        let recorder = self.run(req).instrument(self.span.clone()).await;
        recorder.replay(sink);
    }

    async fn run(&self, req: Request<Bytes>) -> ResponseRecorder {
        let (parts, body) = req.into_parts();
        let max_attempts = self.settings.max_attempts;
        let mut attempt = 1;

        loop {
            let mut recorder = ResponseRecorder::new();
            metrics::record_attempt(&self.name);
            self.upstream
                .serve(Request::from_parts(parts.clone(), body.clone()), &mut recorder)
                .await;

            let status = recorder.status();
            let outcome = self.settings.policy.classify(status);
            tracing::debug!(
                attempt,
                method = %parts.method,
                path = %parts.uri.path(),
                status = status.map(|s| s.as_u16()),
                outcome = %outcome,
                "Upstream attempt finished"
            );

            if outcome.is_success() {
                metrics::record_replay(&self.name, "success");
                return recorder;
            }

            if attempt >= max_attempts {
                tracing::warn!(
                    attempts = attempt,
                    method = %parts.method,
                    path = %parts.uri.path(),
                    status = status.map(|s| s.as_u16()),
                    "Retries exhausted, returning last upstream response"
                );
                metrics::record_replay(&self.name, "exhausted");
                return recorder;
            }

            tracing::info!(
                attempt,
                method = %parts.method,
                path = %parts.uri.path(),
                status = status.map(|s| s.as_u16()),
                delay = ?self.settings.retry_delay,
                "Retrying request"
            );
            tokio::time::sleep(self.settings.retry_delay).await;
            attempt += 1;
        }
    }
}
