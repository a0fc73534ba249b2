//! Failure taxonomy for effect runs
//!
//! Raised failures carry an [`ErrorInfo`] with a stable code. Cancellation,
//! caught panics and internal faults have their own variants so callers can
//! tell them apart without string matching.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/* ===================== Error Codes ===================== */

pub const CANCELLED: &str = "Cancelled";
pub const PANICKED: &str = "Panicked";
pub const INTERNAL: &str = "InternalError";
pub const TYPE_ERROR: &str = "TypeError";

/* ===================== Error Info ===================== */

/// Code and message of a raised failure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    pub code: String,
    pub message: String,
}

impl ErrorInfo {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

/* ===================== Effect Error ===================== */

/// Terminal or intermediate failure of an effect run
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EffectError {
    /// Failure raised by a `Fail` node or returned by a `Delay` thunk
    #[error("{}: {}", .0.code, .0.message)]
    Raised(ErrorInfo),

    /// The run observed a canceled connection
    #[error("run cancelled")]
    Cancelled,

    /// User code panicked and the panic was classified non-fatal
    #[error("panicked: {0}")]
    Panicked(String),

    /// The run-loop reached a state it should never be in
    #[error("internal run-loop failure: {0}")]
    Internal(&'static str),
}

impl EffectError {
    /// Shorthand for a raised failure
    pub fn raised(code: impl Into<String>, message: impl Into<String>) -> Self {
        EffectError::Raised(ErrorInfo::new(code, message))
    }

    /// Code identifying the failure kind
    pub fn code(&self) -> &str {
        match self {
            EffectError::Raised(info) => &info.code,
            EffectError::Cancelled => CANCELLED,
            EffectError::Panicked(_) => PANICKED,
            EffectError::Internal(_) => INTERNAL,
        }
    }

    /// Flatten into an [`ErrorInfo`] so the failure can travel as a value
    pub fn to_info(&self) -> ErrorInfo {
        match self {
            EffectError::Raised(info) => info.clone(),
            other => ErrorInfo::new(other.code(), other.to_string()),
        }
    }
}

impl From<ErrorInfo> for EffectError {
    fn from(info: ErrorInfo) -> Self {
        EffectError::Raised(info)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raised_display_includes_code() {
        let err = EffectError::raised("Boom", "it broke");
        assert_eq!(err.to_string(), "Boom: it broke");
        assert_eq!(err.code(), "Boom");
    }

    #[test]
    fn test_to_info_for_non_raised_variants() {
        let info = EffectError::Cancelled.to_info();
        assert_eq!(info.code, CANCELLED);
        assert_eq!(info.message, "run cancelled");

        let info = EffectError::Panicked("oops".into()).to_info();
        assert_eq!(info.code, PANICKED);
        assert!(info.message.contains("oops"));
    }
}
