//! Retrying reverse proxy library.
//!
//! Captures each upstream response in a [`ResponseRecorder`](http::ResponseRecorder),
//! retries responses the failure policy rejects, and replays exactly one of
//! them to the client.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod resilience;

pub use config::schema::ProxyConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use resilience::{RetryController, RetryLayer};
