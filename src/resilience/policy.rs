//! Failure classification.
//!
//! # Responsibilities
//! - Map a captured status code to success or failure
//!
//! # Design Decisions
//! - Classification is a pure function of status and policy
//! - An unset status is always a success: handlers that never set one get an
//!   implicit `200 OK` from the real sink

use std::collections::BTreeSet;
use std::fmt;

use http::StatusCode;

/// Result of classifying one attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Failure,
}

impl Outcome {
    pub fn is_success(self) -> bool {
        matches!(self, Outcome::Success)
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Success => f.write_str("success"),
            Outcome::Failure => f.write_str("failure"),
        }
    }
}

/// Rule deciding which captured responses trigger a retry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Any status `>= 500` is a failure.
    #[default]
    Threshold,
    /// Exactly the listed status codes are failures.
    Explicit(BTreeSet<u16>),
}

impl FailurePolicy {
    /// Build the policy for an optional list of retry status codes.
    pub fn from_status_codes(codes: Option<&[u16]>) -> Self {
        match codes {
            Some(codes) => FailurePolicy::Explicit(codes.iter().copied().collect()),
            None => FailurePolicy::Threshold,
        }
    }

    pub fn classify(&self, status: Option<StatusCode>) -> Outcome {
        let Some(status) = status else {
            return Outcome::Success;
        };

        let failed = match self {
            FailurePolicy::Threshold => status.as_u16() >= 500,
            FailurePolicy::Explicit(codes) => codes.contains(&status.as_u16()),
        };

        if failed {
            Outcome::Failure
        } else {
            Outcome::Success
        }
    }
}
