use anyhow::Result;
use async_trait::async_trait;
use bytes::Bytes;

use super::{s3, FileStream, S3Storage, StorageDriver, StorageResult};

/// Backblaze B2 backend. B2 exposes an S3-compatible endpoint
/// (`s3.<region>.backblazeb2.com`), so this driver is a dedicated
/// configuration of the S3 client with B2 application-key credentials.
pub struct B2Storage {
    inner: S3Storage,
}

impl B2Storage {
    pub async fn connect(
        key_id: &str,
        application_key: &str,
        endpoint: Option<&str>,
        region: &str,
        bucket: &str,
    ) -> Result<Self> {
        let endpoint = endpoint
            .map(str::to_string)
            .unwrap_or_else(|| format!("https://s3.{region}.backblazeb2.com"));
        let client =
            s3::build_client(Some(&endpoint), Some(key_id), Some(application_key), region).await?;
        Ok(Self {
            inner: S3Storage::new(client, bucket),
        })
    }
}

#[async_trait]
impl StorageDriver for B2Storage {
    async fn save_file(
        &self,
        storage_key: &str,
        bytes: Bytes,
        content_type: Option<String>,
    ) -> StorageResult<()> {
        self.inner.save_file(storage_key, bytes, content_type).await
    }

    async fn get_file_stream(&self, storage_key: &str) -> StorageResult<FileStream> {
        self.inner.get_file_stream(storage_key).await
    }

    async fn delete_file(&self, storage_key: &str) -> StorageResult<()> {
        self.inner.delete_file(storage_key).await
    }
}
