//! Remote archival for pipeline outputs.
//!
//! Provides:
//! - [`RemoteArchive`]: the upload seam the index pipeline talks to
//! - [`ObjectStorage`]: S3-compatible implementation (Allas, MinIO, AWS)

pub mod archive;
pub mod error;
pub mod object_store;

pub use self::object_store::{ObjectStorage, ObjectStorageConfig};
pub use archive::RemoteArchive;
pub use error::{StorageError, StorageResult};
