//! Error types for shared identifiers.

use thiserror::Error;

/// Result type alias using CommonError.
pub type CommonResult<T> = Result<T, CommonError>;

/// Errors raised while parsing shared identifiers.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CommonError {
    #[error("Invalid EPSG code: {0}")]
    InvalidEpsg(String),

    #[error("Unknown band code: {0}")]
    UnknownBand(String),

    #[error("Unsupported resolution: {0}")]
    UnsupportedResolution(String),
}
