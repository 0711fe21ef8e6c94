use std::sync::Arc;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use bytes::Bytes;
use futures_util::stream::BoxStream;
use thiserror::Error;

use crate::config::{AppConfig, StorageDriverKind};

pub mod azure;
pub mod b2;
pub mod fs;
pub mod memory;
pub mod s3;

pub use azure::AzureBlobStorage;
pub use b2::B2Storage;
pub use fs::FsStorage;
pub use memory::MemoryStorage;
pub use s3::S3Storage;

/// Lazy, forward-only byte stream handed back by `get_file_stream`. Drivers
/// must not buffer whole objects to produce it.
pub type FileStream = BoxStream<'static, std::io::Result<Bytes>>;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("an object already exists at storage key {key}")]
    AlreadyExists { key: String },
    #[error("no object found at storage key {key}")]
    NotFound { key: String },
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Uniform save/read/delete contract implemented by every backend. A single
/// driver instance is selected at startup and shared, read-only, across all
/// requests; all documents in a deployment resolve through the same driver.
#[async_trait]
pub trait StorageDriver: Send + Sync + 'static {
    /// Persists `bytes` under the caller-supplied key. Returns
    /// `StorageError::AlreadyExists` when the key is already occupied; the
    /// filesystem and in-memory drivers enforce this with an explicit
    /// existence check, object stores rely on backend semantics.
    async fn save_file(
        &self,
        storage_key: &str,
        bytes: Bytes,
        content_type: Option<String>,
    ) -> StorageResult<()>;

    /// Opens a byte stream over the object at `storage_key`, or
    /// `StorageError::NotFound` when the key is absent.
    async fn get_file_stream(&self, storage_key: &str) -> StorageResult<FileStream>;

    /// Removes the object at `storage_key`. The filesystem driver fails
    /// loudly on a missing key; object-store drivers no-op.
    async fn delete_file(&self, storage_key: &str) -> StorageResult<()>;
}

/// Builds the storage driver named by the configuration. Called once at
/// process startup; call sites never branch on the backend kind again.
pub async fn build_storage(config: &AppConfig) -> Result<Arc<dyn StorageDriver>> {
    let driver: Arc<dyn StorageDriver> = match config.storage_driver {
        StorageDriverKind::Filesystem => {
            let root = config
                .filesystem_storage_root
                .as_deref()
                .ok_or_else(|| anyhow!("FILESYSTEM_STORAGE_ROOT must be set for the filesystem storage driver"))?;
            Arc::new(FsStorage::new(root))
        }
        StorageDriverKind::S3 => {
            let bucket = config
                .s3_bucket
                .as_deref()
                .ok_or_else(|| anyhow!("S3_BUCKET must be set for the s3 storage driver"))?;
            let client = s3::build_client(
                config.aws_endpoint_url.as_deref(),
                config.aws_access_key_id.as_deref(),
                config.aws_secret_access_key.as_deref(),
                &config.aws_region,
            )
            .await?;
            Arc::new(S3Storage::new(client, bucket))
        }
        StorageDriverKind::AzureBlob => {
            let container_url = config.azure_container_url.as_deref().ok_or_else(|| {
                anyhow!("AZURE_STORAGE_CONTAINER_URL must be set for the azure-blob storage driver")
            })?;
            let sas_token = config.azure_sas_token.as_deref().ok_or_else(|| {
                anyhow!("AZURE_STORAGE_SAS_TOKEN must be set for the azure-blob storage driver")
            })?;
            Arc::new(AzureBlobStorage::new(container_url, sas_token)?)
        }
        StorageDriverKind::B2 => {
            let bucket = config
                .b2_bucket
                .as_deref()
                .ok_or_else(|| anyhow!("B2_BUCKET must be set for the b2 storage driver"))?;
            let key_id = config
                .b2_key_id
                .as_deref()
                .ok_or_else(|| anyhow!("B2_KEY_ID must be set for the b2 storage driver"))?;
            let application_key = config.b2_application_key.as_deref().ok_or_else(|| {
                anyhow!("B2_APPLICATION_KEY must be set for the b2 storage driver")
            })?;
            let storage = B2Storage::connect(
                key_id,
                application_key,
                config.b2_endpoint.as_deref(),
                &config.b2_region,
                bucket,
            )
            .await?;
            Arc::new(storage)
        }
        StorageDriverKind::InMemory => Arc::new(MemoryStorage::default()),
    };
    Ok(driver)
}
