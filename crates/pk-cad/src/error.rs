//! Kernel error taxonomy
//!
//! Every fallible kernel call returns a [`CadError`]. Each error maps onto a
//! coarse [`ErrorCode`] so the surrounding application can report it without
//! matching on individual variants.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Coarse error classification handed to the error-reporting layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorCode {
    /// Malformed input (bad index, bad knots, duplicate id, degenerate profile)
    InvalidArgument,
    /// Structurally illegal request (degenerate loop, cycle, re-parenting)
    InvalidOperation,
    /// Resource exhaustion or another unexpected failure
    SystemError,
}

impl ErrorCode {
    /// Stable identifier string
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::InvalidArgument => "InvalidArgument",
            ErrorCode::InvalidOperation => "InvalidOperation",
            ErrorCode::SystemError => "SystemError",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error type for kernel operations
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CadError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Invalid knot vector: {0}")]
    InvalidKnots(String),

    #[error("Index {index} out of range (len {len})")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("Degenerate profile: {0}")]
    DegenerateProfile(String),

    #[error("Face needs at least 3 distinct vertices, got {found}")]
    InsufficientVertices { found: usize },

    #[error("Degenerate loop: {0}")]
    DegenerateLoop(String),

    #[error("Loop is not planar (max deviation {deviation:.3e})")]
    NonPlanar { deviation: f64 },

    #[error("Loop self-intersects between edges {first} and {second}")]
    SelfIntersecting { first: usize, second: usize },

    #[error("Rule already exists: {0}")]
    DuplicateRule(String),

    #[error("Rule not found: {0}")]
    RuleNotFound(String),

    #[error("Unsupported: {0}")]
    Unsupported(String),

    #[error("System error: {0}")]
    System(String),
}

impl CadError {
    /// Classify this error
    pub fn code(&self) -> ErrorCode {
        match self {
            CadError::InvalidArgument(_)
            | CadError::InvalidKnots(_)
            | CadError::IndexOutOfRange { .. }
            | CadError::DegenerateProfile(_)
            | CadError::InsufficientVertices { .. }
            | CadError::DuplicateRule(_)
            | CadError::RuleNotFound(_) => ErrorCode::InvalidArgument,
            CadError::DegenerateLoop(_)
            | CadError::NonPlanar { .. }
            | CadError::SelfIntersecting { .. }
            | CadError::Unsupported(_) => ErrorCode::InvalidOperation,
            CadError::System(_) => ErrorCode::SystemError,
        }
    }
}

/// Result type for kernel operations
pub type CadResult<T> = Result<T, CadError>;

/// Structured error handed to the external error-reporting subsystem
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorReport {
    pub code: ErrorCode,
    pub message: String,
}

impl ErrorReport {
    /// Create a report from a code and message
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for ErrorReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl From<&CadError> for ErrorReport {
    fn from(err: &CadError) -> Self {
        Self::new(err.code(), err.to_string())
    }
}

impl From<CadError> for ErrorReport {
    fn from(err: CadError) -> Self {
        Self::from(&err)
    }
}
