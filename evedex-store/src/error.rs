//! Error types for the storage layer.

use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur in storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Database error from SQLite.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A record or schema violated the model.
    #[error(transparent)]
    Model(#[from] evedex_model::ModelError),

    /// The collection was never defined on this store.
    #[error("unknown collection: {0}")]
    UnknownCollection(String),

    /// A collection was redefined with a different schema.
    #[error("schema conflict for collection: {0}")]
    SchemaConflict(String),

    /// An index scan was requested on a field without an index.
    #[error("no index on '{field}' in collection '{collection}'")]
    IndexUnavailable { collection: String, field: String },

    /// Invalid data.
    #[error("invalid data: {0}")]
    InvalidData(String),

    /// A lock was poisoned by a panicking writer.
    #[error("store lock poisoned")]
    Poisoned,
}
