//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Retry controller produces:
//!     → logging.rs (structured events inside the instance span)
//!     → metrics.rs (attempt and replay counters)
//!
//! Consumers:
//!     → Log aggregation (stdout)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Structured logging with attempt, method, path, status and outcome fields
//! - Metrics are cheap (atomic increments) and no-ops without an exporter

pub mod logging;
pub mod metrics;
