//! Tower middleware around [`RetryController`].
//!
//! [`RetryLayer`] wraps any service that maps `Request<Body>` to `Response`,
//! typically an axum `Router`. The inbound body is buffered once so every
//! attempt sees the same request.

use std::convert::Infallible;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::{
    body::Body,
    response::{IntoResponse, Response},
};
use http::{Request, StatusCode};
use http_body_util::{BodyExt, LengthLimitError, Limited};
use tower::{Layer, Service};
use tracing::Span;

use crate::config::{ConfigError, RetryConfig};
use crate::http::sink::ResponseWriter;
use crate::http::upstream::{ServiceUpstream, Upstream};
use crate::resilience::retries::{RetryController, RetrySettings};

const DEFAULT_BODY_LIMIT: usize = 2 * 1024 * 1024;

/// Layer that retries failed responses of the wrapped service.
#[derive(Clone)]
pub struct RetryLayer {
    settings: Arc<RetrySettings>,
    name: String,
    body_limit: usize,
    span: Option<Span>,
}

impl RetryLayer {
    /// Validate `config` and build the layer. The config's `name` names the instance.
    pub fn new(config: &RetryConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            settings: Arc::new(RetrySettings::from_config(config)?),
            name: config.name.clone(),
            body_limit: DEFAULT_BODY_LIMIT,
            span: None,
        })
    }

    /// Largest request body buffered for replay.
    pub fn with_body_limit(mut self, limit: usize) -> Self {
        self.body_limit = limit;
        self
    }

    /// Log through `span` instead of the default per-instance span.
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = Some(span);
        self
    }
}

impl<S> Layer<S> for RetryLayer {
    type Service = RetryService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        let mut controller = RetryController::from_settings(
            self.settings.clone(),
            ServiceUpstream::new(inner),
            self.name.clone(),
        );
        if let Some(span) = &self.span {
            controller = controller.with_span(span.clone());
        }
        RetryService {
            controller: Arc::new(controller),
            body_limit: self.body_limit,
        }
    }
}

/// Service produced by [`RetryLayer`].
pub struct RetryService<S> {
    controller: Arc<RetryController<ServiceUpstream<S>>>,
    body_limit: usize,
}

impl<S> Clone for RetryService<S> {
    fn clone(&self) -> Self {
        Self {
            controller: self.controller.clone(),
            body_limit: self.body_limit,
        }
    }
}

impl<S> Service<Request<Body>> for RetryService<S>
where
    ServiceUpstream<S>: Upstream,
    S: Send + Sync + 'static,
{
    type Response = Response;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        // The inner service is cloned and driven to readiness per attempt.
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let controller = self.controller.clone();
        let body_limit = self.body_limit;

        Box::pin(async move {
            let (parts, body) = req.into_parts();
            let bytes = match Limited::new(body, body_limit).collect().await {
                Ok(collected) => collected.to_bytes(),
                Err(e) if e.is::<LengthLimitError>() => {
                    tracing::warn!(limit = body_limit, path = %parts.uri.path(), "Request body too large to buffer");
                    return Ok((StatusCode::PAYLOAD_TOO_LARGE, "Request body too large").into_response());
                }
                Err(e) => {
                    tracing::warn!(error = %e, path = %parts.uri.path(), "Failed to read request body");
                    return Ok((StatusCode::BAD_REQUEST, "Failed to read request body").into_response());
                }
            };

            let mut writer = ResponseWriter::new();
            controller
                .handle(Request::from_parts(parts, bytes), &mut writer)
                .await;
            Ok(writer.into_response())
        })
    }
}
