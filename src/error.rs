//! Error taxonomy for the editing engine.
//!
//! Every fallible operation returns [`Result`]. Cache misses are not errors;
//! they surface as `Option::None` from the cache API.

use thiserror::Error;

/// Errors produced by the editing engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EditError {
    /// An argument was out of range or violated a configured bound.
    /// Checked before any state is touched.
    #[error("invalid parameter: {0}")]
    InvalidParameter(&'static str),

    /// The operation is illegal in the current state: too many sessions,
    /// a full operation log, completing a session that is not being edited,
    /// or tearing down an orchestrator with live sessions.
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// A history entry or session lookup failed.
    #[error("not found")]
    NotFound,

    /// Keyword nesting exceeded the configured maximum during completeness
    /// checking. The analysis is aborted; no partial structure is returned.
    #[error("nesting depth exceeds maximum of {max}")]
    DepthExceeded { max: usize },
}

pub type Result<T> = std::result::Result<T, EditError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_messages() {
        let err = EditError::InvalidParameter("entry index out of range");
        assert_eq!(err.to_string(), "invalid parameter: entry index out of range");

        let err = EditError::DepthExceeded { max: 32 };
        assert!(err.to_string().contains("32"), "Got: {err}");
    }

    #[test]
    fn errors_compare() {
        assert_eq!(EditError::NotFound, EditError::NotFound);
        assert_ne!(
            EditError::InvalidParameter("a"),
            EditError::InvalidParameter("b")
        );
    }
}
