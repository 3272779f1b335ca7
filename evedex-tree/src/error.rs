//! Error types for the tree index.

use thiserror::Error;

/// Result type for tree operations.
pub type TreeResult<T> = Result<T, TreeError>;

/// Errors that can occur while loading a market-group tree.
///
/// Cloneable so one pending load can hand the same failure to every waiter.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TreeError {
    /// The tree source could not be reached or answered with a failure.
    #[error("tree fetch failed: {0}")]
    Fetch(String),

    /// The tree document could not be decoded.
    #[error("tree parse failed: {0}")]
    Parse(String),

    /// Two nodes in the forest share an id.
    #[error("duplicate market group id {0}")]
    DuplicateId(i64),

    /// `load` was called on an index built without a source.
    #[error("no tree source configured")]
    NoSource,
}

impl From<serde_json::Error> for TreeError {
    fn from(e: serde_json::Error) -> Self {
        TreeError::Parse(e.to_string())
    }
}
