//! Remote archive abstraction.

use std::path::Path;

use async_trait::async_trait;

use crate::error::StorageResult;

/// Destination for finished output files.
///
/// Implementations only copy the file; deleting the local copy is the
/// caller's decision once the upload has been confirmed.
#[async_trait]
pub trait RemoteArchive: Send + Sync {
    /// Upload `local` under `key`, returning the number of bytes sent.
    async fn upload_file(&self, local: &Path, key: &str) -> StorageResult<u64>;

    /// Human-readable location of an archived key, e.g. `s3://bucket/key`.
    fn location(&self, key: &str) -> String;
}
