//! Capturing response sink.
//!
//! A [`ResponseRecorder`] stands in for the client during one upstream call.
//! Nothing written to it reaches the client until [`ResponseRecorder::replay`]
//! copies it onto a real sink.

use bytes::BytesMut;
use http::{HeaderMap, StatusCode};

use crate::http::sink::ResponseSink;

/// Buffers status, headers and body written by an upstream handler.
#[derive(Debug, Default)]
pub struct ResponseRecorder {
    /// `None` until the handler sets a status explicitly.
    status: Option<StatusCode>,
    headers: HeaderMap,
    body: BytesMut,
}

impl ResponseRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Captured status, or `None` if the handler never set one.
    pub fn status(&self) -> Option<StatusCode> {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Copy the captured response onto `sink`.
    ///
    /// Headers go first, appended value by value so multi-valued headers keep
    /// their order. The status is only written if it was set, leaving the
    /// sink's own default in place otherwise. The body follows as one write.
    pub fn replay(self, sink: &mut dyn ResponseSink) {
        let headers = sink.headers_mut();
        let mut current = None;
        for (name, value) in self.headers {
            // `None` means another value for the previous name.
            if let Some(name) = name {
                current = Some(name);
            }
            if let Some(name) = &current {
                headers.append(name.clone(), value);
            }
        }

        if let Some(status) = self.status {
            sink.set_status(status);
        }

        if !self.body.is_empty() {
            sink.write_body(&self.body);
        }
    }
}

impl ResponseSink for ResponseRecorder {
    fn set_status(&mut self, status: StatusCode) {
        self.status = Some(status);
    }

    fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    fn write_body(&mut self, chunk: &[u8]) -> usize {
        self.body.extend_from_slice(chunk);
        chunk.len()
    }
}
