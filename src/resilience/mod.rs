//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Request:
//!     → layer.rs (buffer body once, per-request entry point)
//!     → retries.rs (attempt loop with fixed delay)
//!     → policy.rs (classify each captured status)
//!     → replay the chosen response
//! ```
//!
//! # Design Decisions
//! - One uniform policy per middleware instance
//! - Settings are validated once and shared read-only through `Arc`
//! - All resilience logic is composable middleware

pub mod layer;
pub mod policy;
pub mod retries;

pub use layer::{RetryLayer, RetryService};
pub use policy::{FailurePolicy, Outcome};
pub use retries::{RetryController, RetrySettings};
