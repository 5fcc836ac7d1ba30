//! Error types for remote storage.

use thiserror::Error;

/// Errors raised while talking to the remote archive.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Connection settings are missing or invalid.
    #[error("invalid storage configuration: {0}")]
    Config(String),

    /// The local file to upload could not be read.
    #[error("failed to read local file {path}: {source}")]
    LocalRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The object store rejected or failed a request.
    #[error("object store request for '{key}' failed: {message}")]
    Request { key: String, message: String },
}

impl StorageError {
    /// Create a Request error.
    pub fn request(key: impl Into<String>, err: impl std::fmt::Display) -> Self {
        Self::Request {
            key: key.into(),
            message: err.to_string(),
        }
    }
}

/// Result type for storage operations.
pub type StorageResult<T> = std::result::Result<T, StorageError>;
