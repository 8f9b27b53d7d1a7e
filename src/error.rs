//! Crate-level error type

use thiserror::Error;

use crate::executor::ExecutorError;
use crate::planner::PlannerError;

/// Any failure of a query: rejected at planning or raised while enumerating
#[derive(Debug, Error)]
pub enum QueryError {
    #[error(transparent)]
    Planner(#[from] PlannerError),

    #[error(transparent)]
    Executor(#[from] ExecutorError),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl QueryError {
    /// Stable string code of the underlying error
    pub fn code(&self) -> &'static str {
        match self {
            QueryError::Planner(err) => err.code().code(),
            QueryError::Executor(err) => err.code(),
            QueryError::InvalidConfig(_) => "QUERY_INVALID_CONFIG",
        }
    }

    /// Whether the query was rejected before any request was issued
    pub fn is_rejection(&self) -> bool {
        matches!(self, QueryError::Planner(_) | QueryError::InvalidConfig(_))
    }
}

/// Result type for query operations
pub type QueryResult<T> = Result<T, QueryError>;
