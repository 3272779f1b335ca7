//! Error types for the session facade.

use thiserror::Error;

/// Result type for session operations.
pub type SessionResult<T> = Result<T, SessionError>;

/// Errors surfaced by a [`Session`](crate::Session).
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("invalid session config: {0}")]
    Config(#[from] serde_json::Error),

    #[error(transparent)]
    Model(#[from] evedex_model::ModelError),

    #[error(transparent)]
    Storage(#[from] evedex_store::StorageError),

    #[error(transparent)]
    Query(#[from] evedex_query::QueryError),

    #[error(transparent)]
    Tree(#[from] evedex_tree::TreeError),

    #[error(transparent)]
    Remote(#[from] evedex_remote::RemoteError),
}
