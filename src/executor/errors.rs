//! Executor error types
//!
//! Error codes:
//! - QUERY_TRANSPORT: the page source failed; the collaborator's error is
//!   carried unchanged
//! - QUERY_MALFORMED_PAGE: a page contradicts the request it answers
//! - QUERY_NO_ELEMENTS: `first` on an empty result
//! - QUERY_DESERIALIZE: a record does not convert into the caller's type

use thiserror::Error;

/// Error type returned by page source collaborators
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors raised while enumerating results
#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error(transparent)]
    Transport(BoxError),

    #[error("malformed page: {0}")]
    MalformedPage(String),

    #[error("sequence contains no elements")]
    NoElements,

    #[error("record conversion failed: {0}")]
    Deserialize(#[from] serde_json::Error),
}

impl ExecutorError {
    /// Wraps a collaborator error
    pub fn transport(err: impl Into<BoxError>) -> Self {
        ExecutorError::Transport(err.into())
    }

    /// Returns the stable string code
    pub fn code(&self) -> &'static str {
        match self {
            ExecutorError::Transport(_) => "QUERY_TRANSPORT",
            ExecutorError::MalformedPage(_) => "QUERY_MALFORMED_PAGE",
            ExecutorError::NoElements => "QUERY_NO_ELEMENTS",
            ExecutorError::Deserialize(_) => "QUERY_DESERIALIZE",
        }
    }
}

/// Result type for executor operations
pub type ExecutorResult<T> = Result<T, ExecutorError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_transport_error_surfaces_unchanged() {
        let err = ExecutorError::transport(io::Error::new(io::ErrorKind::TimedOut, "timed out"));
        assert_eq!(err.to_string(), "timed out");
        assert_eq!(err.code(), "QUERY_TRANSPORT");

        match err {
            ExecutorError::Transport(inner) => {
                let io_err = inner.downcast_ref::<io::Error>().unwrap();
                assert_eq!(io_err.kind(), io::ErrorKind::TimedOut);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_codes() {
        assert_eq!(ExecutorError::NoElements.code(), "QUERY_NO_ELEMENTS");
        assert_eq!(
            ExecutorError::MalformedPage("x".into()).code(),
            "QUERY_MALFORMED_PAGE"
        );
    }
}
