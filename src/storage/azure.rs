use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use bytes::Bytes;
use futures_util::{StreamExt, TryStreamExt};
use reqwest::{header, Client, StatusCode};

use super::{FileStream, StorageDriver, StorageError, StorageResult};

const AZURE_API_VERSION: &str = "2021-08-06";

/// Azure Blob Storage backend speaking the Blob REST API directly, with a
/// container-scoped SAS token for authorization. `If-None-Match: *` on PUT
/// turns an occupied key into a distinguishable conflict.
pub struct AzureBlobStorage {
    http: Client,
    container_url: String,
    sas_token: String,
}

impl AzureBlobStorage {
    pub fn new(container_url: &str, sas_token: &str) -> Result<Self> {
        let http = Client::builder()
            .build()
            .context("failed to build Azure Blob HTTP client")?;
        Ok(Self {
            http,
            container_url: container_url.trim_end_matches('/').to_string(),
            sas_token: sas_token.trim_start_matches('?').to_string(),
        })
    }

    fn blob_url(&self, storage_key: &str) -> String {
        format!("{}/{}?{}", self.container_url, storage_key, self.sas_token)
    }
}

#[async_trait]
impl StorageDriver for AzureBlobStorage {
    async fn save_file(
        &self,
        storage_key: &str,
        bytes: Bytes,
        content_type: Option<String>,
    ) -> StorageResult<()> {
        let mut request = self
            .http
            .put(self.blob_url(storage_key))
            .header("x-ms-blob-type", "BlockBlob")
            .header("x-ms-version", AZURE_API_VERSION)
            .header(header::IF_NONE_MATCH, "*")
            .body(bytes);

        if let Some(content_type) = content_type {
            request = request.header(header::CONTENT_TYPE, content_type);
        }

        let response = request
            .send()
            .await
            .context("failed to upload blob to Azure")?;

        match response.status() {
            status if status.is_success() => Ok(()),
            StatusCode::CONFLICT | StatusCode::PRECONDITION_FAILED => {
                Err(StorageError::AlreadyExists {
                    key: storage_key.to_string(),
                })
            }
            status => Err(StorageError::Other(anyhow!(
                "Azure blob upload failed with status {status}"
            ))),
        }
    }

    async fn get_file_stream(&self, storage_key: &str) -> StorageResult<FileStream> {
        let response = self
            .http
            .get(self.blob_url(storage_key))
            .header("x-ms-version", AZURE_API_VERSION)
            .send()
            .await
            .context("failed to download blob from Azure")?;

        match response.status() {
            status if status.is_success() => Ok(response
                .bytes_stream()
                .map_err(std::io::Error::other)
                .boxed()),
            StatusCode::NOT_FOUND => Err(StorageError::NotFound {
                key: storage_key.to_string(),
            }),
            status => Err(StorageError::Other(anyhow!(
                "Azure blob download failed with status {status}"
            ))),
        }
    }

    async fn delete_file(&self, storage_key: &str) -> StorageResult<()> {
        let response = self
            .http
            .delete(self.blob_url(storage_key))
            .header("x-ms-version", AZURE_API_VERSION)
            .send()
            .await
            .context("failed to delete blob from Azure")?;

        match response.status() {
            status if status.is_success() => Ok(()),
            StatusCode::NOT_FOUND => Ok(()),
            status => Err(StorageError::Other(anyhow!(
                "Azure blob delete failed with status {status}"
            ))),
        }
    }
}
