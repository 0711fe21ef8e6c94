use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use aws_config::meta::region::RegionProviderChain;
use aws_credential_types::Credentials;
use aws_sdk_s3::{
    config::{Builder as S3ConfigBuilder, Region},
    error::SdkError,
    primitives::ByteStream,
    Client as S3Client,
};
use bytes::Bytes;
use futures_util::StreamExt;
use tokio_util::io::ReaderStream;

use super::{FileStream, StorageDriver, StorageError, StorageResult};

pub async fn build_client(
    endpoint_url: Option<&str>,
    access_key_id: Option<&str>,
    secret_access_key: Option<&str>,
    region: &str,
) -> Result<S3Client> {
    let region = Region::new(region.to_string());
    let region_provider = RegionProviderChain::first_try(Some(region))
        .or_default_provider()
        .or_else("us-east-1");

    #[allow(deprecated)]
    let mut loader = aws_config::from_env().region(region_provider);

    if let Some(endpoint) = endpoint_url {
        loader = loader.endpoint_url(endpoint);
    }

    if let (Some(access_key), Some(secret_key)) = (access_key_id, secret_access_key) {
        let credentials = Credentials::new(access_key, secret_key, None, None, "static");
        loader = loader.credentials_provider(credentials);
    }

    let base_config = loader.load().await;
    let s3_config = S3ConfigBuilder::from(&base_config)
        .force_path_style(true)
        .build();

    Ok(S3Client::from_conf(s3_config))
}

/// S3-compatible backend. Writes are conditional (`If-None-Match: *`) so an
/// occupied key surfaces as a conflict instead of a silent overwrite.
pub struct S3Storage {
    client: S3Client,
    bucket: String,
}

impl S3Storage {
    pub fn new(client: S3Client, bucket: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
        }
    }
}

#[async_trait]
impl StorageDriver for S3Storage {
    async fn save_file(
        &self,
        storage_key: &str,
        bytes: Bytes,
        content_type: Option<String>,
    ) -> StorageResult<()> {
        let mut request = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(storage_key)
            .if_none_match("*")
            .body(ByteStream::from(bytes));

        if let Some(content_type) = content_type {
            request = request.content_type(content_type);
        }

        request.send().await.map_err(|err| match &err {
            SdkError::ServiceError(service_err)
                if service_err.raw().status().as_u16() == 412 =>
            {
                StorageError::AlreadyExists {
                    key: storage_key.to_string(),
                }
            }
            _ => StorageError::Other(anyhow!("failed to upload object to S3: {err}")),
        })?;

        Ok(())
    }

    async fn get_file_stream(&self, storage_key: &str) -> StorageResult<FileStream> {
        let response = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(storage_key)
            .send()
            .await
            .map_err(|err| match &err {
                SdkError::ServiceError(service_err) if service_err.err().is_no_such_key() => {
                    StorageError::NotFound {
                        key: storage_key.to_string(),
                    }
                }
                _ => StorageError::Other(anyhow!("failed to download object from S3: {err}")),
            })?;

        Ok(ReaderStream::new(response.body.into_async_read()).boxed())
    }

    async fn delete_file(&self, storage_key: &str) -> StorageResult<()> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(storage_key)
            .send()
            .await
            .context("failed to delete object from S3")?;
        Ok(())
    }
}
