//! Error types for raster I/O.

use std::path::Path;
use thiserror::Error;

/// Errors that can occur while reading, writing or warping rasters.
#[derive(Error, Debug)]
pub enum RasterError {
    /// Failed to open a raster file.
    #[error("failed to open raster {path}: {message}")]
    OpenFailed { path: String, message: String },

    /// Failed to decode raster data.
    #[error("failed to decode raster: {0}")]
    DecodeFailed(String),

    /// Failed to encode raster data.
    #[error("failed to encode raster: {0}")]
    EncodeFailed(String),

    /// The raster uses a sample layout this driver does not handle.
    #[error("unsupported raster layout: {0}")]
    Unsupported(String),

    /// Georeferencing tags are missing or malformed.
    #[error("invalid georeference: {0}")]
    InvalidGeoreference(String),

    /// Grid dimensions do not match the profile they are written with.
    #[error("grid shape {actual:?} does not match expected {expected:?}")]
    ShapeMismatch {
        expected: (usize, usize),
        actual: (usize, usize),
    },

    /// Projection lookup or transformation failed.
    #[error("projection error: {0}")]
    ProjectionError(String),

    /// Storage/IO error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl RasterError {
    /// Create an OpenFailed error.
    pub fn open_failed(path: &Path, msg: impl Into<String>) -> Self {
        Self::OpenFailed {
            path: path.display().to_string(),
            message: msg.into(),
        }
    }

    /// Create a DecodeFailed error.
    pub fn decode_failed(msg: impl Into<String>) -> Self {
        Self::DecodeFailed(msg.into())
    }

    /// Create an EncodeFailed error.
    pub fn encode_failed(msg: impl Into<String>) -> Self {
        Self::EncodeFailed(msg.into())
    }

    /// Create a ProjectionError.
    pub fn projection(msg: impl Into<String>) -> Self {
        Self::ProjectionError(msg.into())
    }
}

impl From<tiff::TiffError> for RasterError {
    fn from(err: tiff::TiffError) -> Self {
        match err {
            tiff::TiffError::IoError(e) => Self::Io(e),
            other => Self::DecodeFailed(other.to_string()),
        }
    }
}

/// Result type for raster operations.
pub type Result<T> = std::result::Result<T, RasterError>;
