//! Error types for the index and reprojection pipelines.

use std::io;
use std::path::PathBuf;

use raster_io::RasterError;
use storage::StorageError;
use thiserror::Error;
use tile_common::{BandId, CommonError, Epsg, SpectralBand};

/// Errors raised while planning or executing a batch.
///
/// Configuration errors (see [`IndexError::is_configuration`]) abort a run
/// before anything is scheduled; every other variant is reported against the
/// work item that produced it.
#[derive(Error, Debug)]
pub enum IndexError {
    /// One or more requested index names are not registered.
    #[error("unknown index: {0}")]
    UnknownIndex(String),

    /// A command-line style argument is missing or malformed.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Pipeline settings failed to load or validate.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The reprojection source directory holds no `*.tif` tiles.
    #[error("No tifs were found in {}, please check your inputs", .0.display())]
    NoTilesFound(PathBuf),

    /// The target CRS is not in the projection database.
    #[error("unsupported target CRS {0}")]
    UnsupportedCrs(Epsg),

    #[error(transparent)]
    Common(#[from] CommonError),

    /// A tile directory could not be listed.
    #[error("failed to read directory {}: {source}", .path.display())]
    DirectoryRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A tile directory holds no file following the naming convention.
    #[error("no band files following the naming convention in {}", .0.display())]
    NoBandFiles(PathBuf),

    /// The band an index needs is not present in the tile directory.
    #[error("band {band} not found in {}", .directory.display())]
    BandNotFound { directory: PathBuf, band: BandId },

    /// A formula asked for a band that was not loaded for it.
    #[error("band {0} was not loaded for this index")]
    BandNotLoaded(SpectralBand),

    /// Bands loaded for one index do not share a grid shape.
    #[error("band {band} has shape {actual:?}, expected {expected:?}")]
    ShapeMismatch {
        band: BandId,
        expected: (usize, usize),
        actual: (usize, usize),
    },

    /// Archiving needs a timeframe token the file prefix does not carry.
    #[error("no timeframe token in output file name '{0}'")]
    MissingTimeframe(String),

    /// The per-index output directory could not be created.
    #[error("failed to create output directory {}: {source}", .path.display())]
    OutputDirectory {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Raster(#[from] RasterError),

    /// Upload failed; the local file was kept.
    #[error("upload of {} to '{key}' failed, local file kept: {source}", .path.display())]
    ArchiveUpload {
        path: PathBuf,
        key: String,
        #[source]
        source: StorageError,
    },

    /// Upload succeeded but the local copy could not be removed.
    #[error("uploaded to '{key}' but failed to remove local file {}: {source}", .path.display())]
    LocalCleanup {
        path: PathBuf,
        key: String,
        #[source]
        source: io::Error,
    },

    /// The task executing a work item panicked or was cancelled.
    #[error("task failed: {0}")]
    TaskFailed(String),
}

impl IndexError {
    /// True for errors that must abort the whole run before scheduling.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            IndexError::UnknownIndex(_)
                | IndexError::InvalidArgument(_)
                | IndexError::InvalidConfig(_)
                | IndexError::NoTilesFound(_)
                | IndexError::UnsupportedCrs(_)
                | IndexError::Common(_)
        )
    }

    /// Create an InvalidArgument error.
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    /// Create an InvalidConfig error.
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }
}

/// Result type for pipeline operations.
pub type Result<T> = std::result::Result<T, IndexError>;

#[cfg(test)]
mod tests {
    use super::*;
    use tile_common::Resolution;

    #[test]
    fn test_configuration_classification() {
        assert!(IndexError::UnknownIndex("foo".into()).is_configuration());
        assert!(IndexError::NoTilesFound(PathBuf::from("/tiles")).is_configuration());
        assert!(IndexError::invalid_argument("--indices is empty").is_configuration());

        let missing = IndexError::BandNotFound {
            directory: PathBuf::from("/data/tileA"),
            band: BandId::new(SpectralBand::Red, Resolution::R10m),
        };
        assert!(!missing.is_configuration());
        assert_eq!(missing.to_string(), "band B04@10m not found in /data/tileA");
    }

    #[test]
    fn test_no_tiles_message() {
        let err = IndexError::NoTilesFound(PathBuf::from("/tiles"));
        assert_eq!(
            err.to_string(),
            "No tifs were found in /tiles, please check your inputs"
        );
    }
}
