//! Forwarding to the backend.
//!
//! # Responsibilities
//! - Send the inbound request to the configured backend
//! - Hand the backend response back unchanged
//!
//! # Design Decisions
//! - Only scheme and authority are rewritten; method, path, query, headers and
//!   body go through as received
//! - An unreachable backend yields `502 Bad Gateway` and a backend that does
//!   not answer within the per-attempt timeout yields `504 Gateway Timeout`.
//!   The retry layer classifies both like any other upstream response

use std::str::FromStr;
use std::time::Duration;

use axum::{
    body::Body,
    extract::State,
    http::{
        uri::{Authority, PathAndQuery, Scheme},
        Request, StatusCode, Uri,
    },
    response::{IntoResponse, Response},
};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};

/// Client and target shared by every forwarded request.
#[derive(Clone)]
pub struct Forwarder {
    client: Client<HttpConnector, Body>,
    authority: Authority,
    timeout: Duration,
}

impl Forwarder {
    /// Create a forwarder for `address` (`host:port`).
    ///
    /// `timeout` bounds each forwarded request until the response head arrives.
    pub fn new(address: &str, timeout: Duration) -> Result<Self, http::uri::InvalidUri> {
        let authority = Authority::from_str(address)?;
        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());
        Ok(Self {
            client,
            authority,
            timeout,
        })
    }

    pub fn authority(&self) -> &Authority {
        &self.authority
    }

    fn target_uri(&self, uri: &Uri) -> Uri {
        let mut parts = uri.clone().into_parts();
        parts.scheme = Some(Scheme::HTTP);
        parts.authority = Some(self.authority.clone());
        if parts.path_and_query.is_none() {
            parts.path_and_query = Some(PathAndQuery::from_static("/"));
        }
        Uri::from_parts(parts).unwrap_or_else(|_| uri.clone())
    }

    /// Forward one request to the backend.
    pub async fn forward(&self, request: Request<Body>) -> Response {
        let (mut parts, body) = request.into_parts();
        parts.uri = self.target_uri(&parts.uri);
        let method = parts.method.clone();
        let uri = parts.uri.clone();

        let request = self.client.request(Request::from_parts(parts, body));
        match tokio::time::timeout(self.timeout, request).await {
            Ok(Ok(response)) => {
                let (parts, body) = response.into_parts();
                Response::from_parts(parts, Body::new(body))
            }
            Ok(Err(e)) => {
                tracing::error!(method = %method, uri = %uri, error = %e, "Upstream error");
                (StatusCode::BAD_GATEWAY, "Upstream request failed").into_response()
            }
            Err(_) => {
                tracing::warn!(
                    method = %method,
                    uri = %uri,
                    timeout = ?self.timeout,
                    "Upstream request timed out"
                );
                (StatusCode::GATEWAY_TIMEOUT, "Upstream request timed out").into_response()
            }
        }
    }
}

/// Axum handler forwarding every request.
pub async fn forward_handler(State(forwarder): State<Forwarder>, request: Request<Body>) -> Response {
    forwarder.forward(request).await
}
