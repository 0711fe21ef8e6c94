use std::path::{Component, Path, PathBuf};

use anyhow::{anyhow, Context};
use async_trait::async_trait;
use bytes::Bytes;
use futures_util::StreamExt;
use tokio::fs;
use tokio_util::io::ReaderStream;

use super::{FileStream, StorageDriver, StorageError, StorageResult};

/// Local-filesystem backend. Storage keys map to paths below `root`; keys
/// containing parent-directory components are rejected outright.
pub struct FsStorage {
    root: PathBuf,
}

impl FsStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, storage_key: &str) -> StorageResult<PathBuf> {
        let relative = Path::new(storage_key);
        let escapes_root = relative
            .components()
            .any(|component| !matches!(component, Component::Normal(_)));
        if storage_key.is_empty() || escapes_root {
            return Err(StorageError::Other(anyhow!(
                "invalid storage key '{storage_key}'"
            )));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl StorageDriver for FsStorage {
    async fn save_file(
        &self,
        storage_key: &str,
        bytes: Bytes,
        _content_type: Option<String>,
    ) -> StorageResult<()> {
        let path = self.resolve(storage_key)?;

        let occupied = fs::try_exists(&path)
            .await
            .with_context(|| format!("failed to probe {}", path.display()))?;
        if occupied {
            return Err(StorageError::AlreadyExists {
                key: storage_key.to_string(),
            });
        }

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }

        fs::write(&path, &bytes)
            .await
            .with_context(|| format!("failed to write {}", path.display()))?;
        Ok(())
    }

    async fn get_file_stream(&self, storage_key: &str) -> StorageResult<FileStream> {
        let path = self.resolve(storage_key)?;
        let file = match fs::File::open(&path).await {
            Ok(file) => file,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(StorageError::NotFound {
                    key: storage_key.to_string(),
                });
            }
            Err(err) => {
                return Err(StorageError::Other(
                    anyhow::Error::from(err).context(format!("failed to open {}", path.display())),
                ));
            }
        };
        Ok(ReaderStream::new(file).boxed())
    }

    async fn delete_file(&self, storage_key: &str) -> StorageResult<()> {
        let path = self.resolve(storage_key)?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound {
                    key: storage_key.to_string(),
                })
            }
            Err(err) => Err(StorageError::Other(
                anyhow::Error::from(err).context(format!("failed to delete {}", path.display())),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use futures_util::TryStreamExt;

    use super::*;

    async fn collect(stream: FileStream) -> Vec<u8> {
        stream
            .try_fold(Vec::new(), |mut acc, chunk| async move {
                acc.extend_from_slice(&chunk);
                Ok(acc)
            })
            .await
            .expect("stream read failed")
    }

    #[tokio::test]
    async fn roundtrips_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FsStorage::new(dir.path());

        storage
            .save_file("org_1/originals/doc_1.pdf", Bytes::from_static(b"hello"), None)
            .await
            .unwrap();

        let stream = storage.get_file_stream("org_1/originals/doc_1.pdf").await.unwrap();
        assert_eq!(collect(stream).await, b"hello");
    }

    #[tokio::test]
    async fn rejects_occupied_keys() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FsStorage::new(dir.path());

        storage
            .save_file("k", Bytes::from_static(b"a"), None)
            .await
            .unwrap();
        let err = storage
            .save_file("k", Bytes::from_static(b"b"), None)
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::AlreadyExists { .. }));
    }

    #[tokio::test]
    async fn delete_fails_loudly_when_absent() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FsStorage::new(dir.path());

        let err = storage.delete_file("missing").await.unwrap_err();
        assert!(matches!(err, StorageError::NotFound { .. }));
    }

    #[tokio::test]
    async fn rejects_keys_escaping_the_root() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FsStorage::new(dir.path());

        let err = storage
            .save_file("../outside", Bytes::from_static(b"x"), None)
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Other(_)));
    }
}
