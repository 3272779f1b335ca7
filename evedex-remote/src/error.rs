//! Error types for the remote data source.

use evedex_tree::TreeError;
use thiserror::Error;

/// Result type for remote operations.
pub type RemoteResult<T> = Result<T, RemoteError>;

/// Errors that can occur while talking to the static data API.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// The API answered with a non-success status.
    #[error("{endpoint} returned {status}: {body}")]
    Status {
        endpoint: String,
        status: u16,
        body: String,
    },

    /// The request never produced a response (connection, TLS, timeout).
    #[error("request to {endpoint} failed: {reason}")]
    Fetch { endpoint: String, reason: String },

    /// The response body was not the expected JSON.
    #[error("could not decode {endpoint} response: {reason}")]
    Decode { endpoint: String, reason: String },

    /// The HTTP client could not be built from the configuration.
    #[error("invalid client configuration: {0}")]
    Client(String),

    /// Writing fetched rows to the local store failed.
    #[error("storage error: {0}")]
    Storage(#[from] evedex_store::StorageError),
}

impl From<RemoteError> for TreeError {
    fn from(e: RemoteError) -> Self {
        let message = e.to_string();
        match e {
            RemoteError::Decode { .. } => TreeError::Parse(message),
            _ => TreeError::Fetch(message),
        }
    }
}
