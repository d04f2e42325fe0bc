//! Response sink abstraction.
//!
//! # Responsibilities
//! - Define the three write paths an upstream handler uses (status, headers, body)
//! - Provide the passthrough sink that becomes the client response
//!
//! # Design Decisions
//! - Status, headers and body are separate operations so a capturing sink can
//!   intercept each of them without forwarding anything
//! - The passthrough sink commits its status on the first body write, matching
//!   what a client would observe on the wire

use axum::{body::Body, response::Response};
use bytes::{Bytes, BytesMut};
use http::{HeaderMap, StatusCode};

/// Destination for a response produced by an upstream handler.
pub trait ResponseSink: Send {
    /// Set the response status code.
    fn set_status(&mut self, status: StatusCode);

    /// Mutable access to the response headers.
    fn headers_mut(&mut self) -> &mut HeaderMap;

    /// Append bytes to the response body, returning how many were accepted.
    fn write_body(&mut self, chunk: &[u8]) -> usize;
}

/// Passthrough sink that assembles the response sent to the client.
#[derive(Debug, Default)]
pub struct ResponseWriter {
    status: Option<StatusCode>,
    headers: HeaderMap,
    body: BytesMut,
    committed: bool,
}

impl ResponseWriter {
    /// Create an empty writer. Its status defaults to `200 OK`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Status the client will receive.
    pub fn status(&self) -> StatusCode {
        self.status.unwrap_or(StatusCode::OK)
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Finish writing and build the outbound response.
    pub fn into_response(self) -> Response {
        let status = self.status();
        let mut response = Response::new(Body::from(Bytes::from(self.body)));
        *response.status_mut() = status;
        *response.headers_mut() = self.headers;
        response
    }
}

impl ResponseSink for ResponseWriter {
    fn set_status(&mut self, status: StatusCode) {
        if self.committed {
            tracing::warn!(
                status = status.as_u16(),
                "Status set after body write, ignoring"
            );
            return;
        }
        self.status = Some(status);
    }

    fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    fn write_body(&mut self, chunk: &[u8]) -> usize {
        self.committed = true;
        self.body.extend_from_slice(chunk);
        chunk.len()
    }
}
