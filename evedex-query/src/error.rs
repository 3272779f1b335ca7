//! Error types for the query engine.

use thiserror::Error;

/// Result type for query operations.
pub type QueryResult<T> = Result<T, QueryError>;

/// Errors that can occur while building or running a query.
#[derive(Debug, Error)]
pub enum QueryError {
    /// The operator name is not one the engine understands.
    #[error("unsupported operator: {0}")]
    UnsupportedOperator(String),

    /// The filter value has the wrong shape for its operator.
    #[error("invalid value for {operator} filter on '{field}': {reason}")]
    InvalidFilterValue {
        field: String,
        operator: &'static str,
        reason: String,
    },

    /// Limits must be positive.
    #[error("query limit must be positive")]
    InvalidLimit,

    /// Storage error surfaced from the collection.
    #[error("storage error: {0}")]
    Storage(#[from] evedex_store::StorageError),
}
