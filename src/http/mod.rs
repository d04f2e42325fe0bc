//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware stack)
//!     → resilience::RetryLayer (buffer request, run attempts)
//!         → upstream.rs (invoke next stage against a recorder)
//!         → forward.rs (send to backend)
//!         → recorder.rs (capture status, headers, body)
//!     → sink.rs (replayed response becomes the client response)
//!     → Send to client
//! ```

pub mod forward;
pub mod recorder;
pub mod server;
pub mod sink;
pub mod upstream;

pub use recorder::ResponseRecorder;
pub use server::HttpServer;
pub use sink::{ResponseSink, ResponseWriter};
pub use upstream::{upstream_fn, ServiceUpstream, Upstream};
