//! Upstream handlers.
//!
//! # Responsibilities
//! - Define the re-invocable handler the retry loop calls once per attempt
//! - Adapt tower services (an axum `Router`, the forwarding client) to it
//! - Adapt plain closures for embedding and tests
//!
//! # Design Decisions
//! - Handlers only ever see a `&mut dyn ResponseSink`, so they cannot tell a
//!   recorder from the real client
//! - Service bodies are copied frame by frame, so streamed bodies arrive as
//!   several writes
//! - A body that fails mid-stream becomes `502 Bad Gateway`

use std::fmt;

use async_trait::async_trait;
use axum::{body::Body, response::Response};
use bytes::Bytes;
use http::{Request, StatusCode};
use http_body_util::BodyExt;
use tower::{Service, ServiceExt};

use crate::http::sink::ResponseSink;

/// The next stage of the request pipeline.
///
/// Called once per attempt with a fresh sink. The request is the same every
/// time.
#[async_trait]
pub trait Upstream: Send + Sync {
    async fn serve(&self, req: Request<Bytes>, sink: &mut dyn ResponseSink);
}

/// Runs a tower service as an upstream.
///
/// The service is cloned for every call. A service error is written to the
/// sink as `502 Bad Gateway`.
#[derive(Clone)]
pub struct ServiceUpstream<S> {
    inner: S,
}

impl<S> ServiceUpstream<S> {
    pub fn new(inner: S) -> Self {
        Self { inner }
    }
}

impl<S> fmt::Debug for ServiceUpstream<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceUpstream").finish_non_exhaustive()
    }
}

#[async_trait]
impl<S> Upstream for ServiceUpstream<S>
where
    S: Service<Request<Body>, Response = Response> + Clone + Send + Sync + 'static,
    S::Future: Send,
    S::Error: fmt::Display + Send,
{
    async fn serve(&self, req: Request<Bytes>, sink: &mut dyn ResponseSink) {
        let req = req.map(Body::from);
        match self.inner.clone().oneshot(req).await {
            Ok(response) => write_response(response, sink).await,
            Err(e) => {
                tracing::error!(error = %e, "Upstream service failed");
                sink.set_status(StatusCode::BAD_GATEWAY);
            }
        }
    }
}

/// Copy a complete response into `sink`, one write per body data frame.
///
/// The body is read to the end before anything reaches `sink`. If the stream
/// fails partway the sink only gets `502 Bad Gateway`, never a truncated copy.
pub async fn write_response(response: Response, sink: &mut dyn ResponseSink) {
    let (parts, mut body) = response.into_parts();

    let mut chunks = Vec::new();
    while let Some(frame) = body.frame().await {
        match frame {
            Ok(frame) => {
                if let Ok(data) = frame.into_data() {
                    chunks.push(data);
                }
            }
            Err(e) => {
                tracing::warn!(
                    status = parts.status.as_u16(),
                    error = %e,
                    "Upstream body stream failed, discarding partial response"
                );
                sink.set_status(StatusCode::BAD_GATEWAY);
                return;
            }
        }
    }

    sink.set_status(parts.status);
    let headers = sink.headers_mut();
    for (name, value) in parts.headers.iter() {
        headers.append(name.clone(), value.clone());
    }
    for chunk in &chunks {
        sink.write_body(chunk);
    }
}

/// Upstream backed by a synchronous closure.
pub struct UpstreamFn<F> {
    f: F,
}

/// Wrap a closure as an [`Upstream`].
pub fn upstream_fn<F>(f: F) -> UpstreamFn<F>
where
    F: Fn(&Request<Bytes>, &mut dyn ResponseSink) + Send + Sync,
{
    UpstreamFn { f }
}

#[async_trait]
impl<F> Upstream for UpstreamFn<F>
where
    F: Fn(&Request<Bytes>, &mut dyn ResponseSink) + Send + Sync,
{
    async fn serve(&self, req: Request<Bytes>, sink: &mut dyn ResponseSink) {
        (self.f)(&req, sink)
    }
}
