//! Error types for the record model.

use thiserror::Error;

/// Result type for model operations.
pub type ModelResult<T> = Result<T, ModelError>;

/// Errors raised while defining schemas or reading records against them.
#[derive(Debug, Error)]
pub enum ModelError {
    /// The schema declaration is malformed.
    #[error("invalid schema for '{collection}': {reason}")]
    InvalidSchema { collection: String, reason: String },

    /// A record lacks a usable (number or string) primary key.
    #[error("record in '{collection}' has no usable primary key '{field}'")]
    MissingPrimaryKey { collection: String, field: String },

    /// The JSON payload is not an object or failed to parse.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
