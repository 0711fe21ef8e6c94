use std::collections::HashMap;

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::{stream, StreamExt};
use tokio::sync::Mutex;

use super::{FileStream, StorageDriver, StorageError, StorageResult};

/// In-memory backend used by the test suites. The backing map is behind an
/// async mutex so concurrent saves from parallel ingestions stay safe.
#[derive(Default)]
pub struct MemoryStorage {
    objects: Mutex<HashMap<String, Bytes>>,
}

impl MemoryStorage {
    pub async fn get(&self, storage_key: &str) -> Option<Bytes> {
        let guard = self.objects.lock().await;
        guard.get(storage_key).cloned()
    }

    pub async fn contains(&self, storage_key: &str) -> bool {
        let guard = self.objects.lock().await;
        guard.contains_key(storage_key)
    }

    pub async fn object_count(&self) -> usize {
        let guard = self.objects.lock().await;
        guard.len()
    }
}

#[async_trait]
impl StorageDriver for MemoryStorage {
    async fn save_file(
        &self,
        storage_key: &str,
        bytes: Bytes,
        _content_type: Option<String>,
    ) -> StorageResult<()> {
        let mut guard = self.objects.lock().await;
        if guard.contains_key(storage_key) {
            return Err(StorageError::AlreadyExists {
                key: storage_key.to_string(),
            });
        }
        guard.insert(storage_key.to_string(), bytes);
        Ok(())
    }

    async fn get_file_stream(&self, storage_key: &str) -> StorageResult<FileStream> {
        let guard = self.objects.lock().await;
        let bytes = guard
            .get(storage_key)
            .cloned()
            .ok_or_else(|| StorageError::NotFound {
                key: storage_key.to_string(),
            })?;
        Ok(stream::once(async move { Ok(bytes) }).boxed())
    }

    async fn delete_file(&self, storage_key: &str) -> StorageResult<()> {
        let mut guard = self.objects.lock().await;
        guard.remove(storage_key);
        Ok(())
    }
}
