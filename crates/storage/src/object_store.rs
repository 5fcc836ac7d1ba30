//! Object storage client (S3 compatible).

use std::env;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use object_store::{aws::AmazonS3Builder, path::Path, ObjectStore};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::archive::RemoteArchive;
use crate::error::{StorageError, StorageResult};

/// Configuration for object storage connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectStorageConfig {
    /// S3 endpoint URL
    pub endpoint: String,
    /// Bucket name
    pub bucket: String,
    /// Access key ID (empty: let the S3 client resolve credentials itself)
    pub access_key_id: String,
    /// Secret access key
    pub secret_access_key: String,
    /// Region
    pub region: String,
    /// Allow plain HTTP endpoints (local MinIO)
    pub allow_http: bool,
}

impl Default for ObjectStorageConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://a3s.fi".to_string(),
            bucket: "mosaicbucket".to_string(),
            access_key_id: String::new(),
            secret_access_key: String::new(),
            region: "us-east-1".to_string(),
            allow_http: false,
        }
    }
}

impl ObjectStorageConfig {
    /// Load from `S3_*` environment variables, falling back to the defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            endpoint: env::var("S3_ENDPOINT").unwrap_or(defaults.endpoint),
            bucket: env::var("S3_BUCKET").unwrap_or(defaults.bucket),
            access_key_id: env::var("S3_ACCESS_KEY").unwrap_or(defaults.access_key_id),
            secret_access_key: env::var("S3_SECRET_KEY").unwrap_or(defaults.secret_access_key),
            region: env::var("S3_REGION").unwrap_or(defaults.region),
            allow_http: env::var("S3_ALLOW_HTTP")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(defaults.allow_http),
        }
    }

    pub fn validate(&self) -> StorageResult<()> {
        if self.endpoint.trim().is_empty() {
            return Err(StorageError::Config("endpoint is empty".to_string()));
        }
        if self.bucket.trim().is_empty() {
            return Err(StorageError::Config("bucket is empty".to_string()));
        }
        if self.access_key_id.is_empty() != self.secret_access_key.is_empty() {
            return Err(StorageError::Config(
                "S3_ACCESS_KEY and S3_SECRET_KEY must be set together".to_string(),
            ));
        }
        Ok(())
    }
}

/// Object storage client.
pub struct ObjectStorage {
    store: Arc<dyn ObjectStore>,
    bucket: String,
}

impl ObjectStorage {
    /// Create a new object storage client from config.
    pub fn new(config: &ObjectStorageConfig) -> StorageResult<Self> {
        config.validate()?;

        let mut builder = AmazonS3Builder::new()
            .with_endpoint(&config.endpoint)
            .with_bucket_name(&config.bucket)
            .with_region(&config.region);

        if !config.access_key_id.is_empty() {
            builder = builder
                .with_access_key_id(&config.access_key_id)
                .with_secret_access_key(&config.secret_access_key);
        }
        if config.allow_http {
            builder = builder.with_allow_http(true);
        }

        let store = builder
            .build()
            .map_err(|e| StorageError::Config(format!("Failed to create S3 client: {}", e)))?;

        Ok(Self::with_store(Arc::new(store), &config.bucket))
    }

    /// Wrap an existing store (e.g. `object_store::memory::InMemory` in tests).
    pub fn with_store(store: Arc<dyn ObjectStore>, bucket: &str) -> Self {
        Self {
            store,
            bucket: bucket.to_string(),
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Write bytes to a path in the bucket.
    #[instrument(skip(self, data), fields(bucket = %self.bucket, path = %path))]
    pub async fn put(&self, path: &str, data: Bytes) -> StorageResult<()> {
        let location = Path::from(path);
        debug!(size = data.len(), "Writing object");

        self.store
            .put(&location, data.into())
            .await
            .map_err(|e| StorageError::request(path, e))?;

        Ok(())
    }
}

#[async_trait]
impl RemoteArchive for ObjectStorage {
    #[instrument(skip(self), fields(bucket = %self.bucket, local = %local.display(), key = %key))]
    async fn upload_file(&self, local: &std::path::Path, key: &str) -> StorageResult<u64> {
        let data = tokio::fs::read(local)
            .await
            .map_err(|source| StorageError::LocalRead {
                path: local.display().to_string(),
                source,
            })?;
        let size = data.len() as u64;

        self.put(key, Bytes::from(data)).await?;
        debug!(size, "Uploaded file");
        Ok(size)
    }

    fn location(&self, key: &str) -> String {
        format!("s3://{}/{}", self.bucket, key)
    }
}
