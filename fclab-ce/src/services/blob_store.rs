//! Image byte storage
//!
//! The engine only needs "bytes for image id" and a way to register new bytes;
//! [`FsBlobStore`] keeps one file per image under `<root>/blobs`.

use async_trait::async_trait;
use fclab_common::{Error, Result};
use std::io::ErrorKind;
use std::path::PathBuf;
use uuid::Uuid;

#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Bytes for an image; `BlobMissing` if they are gone
    async fn fetch(&self, image_id: Uuid) -> Result<Vec<u8>>;

    /// Store (or replace) the bytes for an image
    async fn store(&self, image_id: Uuid, bytes: &[u8]) -> Result<()>;

    /// Drop every stored blob; returns how many were removed
    async fn clear(&self) -> Result<usize>;
}

/// Filesystem-backed blob store
#[derive(Debug, Clone)]
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Location of an image's bytes
    pub fn blob_path(&self, image_id: Uuid) -> PathBuf {
        self.root.join(image_id.to_string())
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn fetch(&self, image_id: Uuid) -> Result<Vec<u8>> {
        match tokio::fs::read(self.blob_path(image_id)).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(Error::BlobMissing(image_id)),
            Err(e) => Err(e.into()),
        }
    }

    async fn store(&self, image_id: Uuid, bytes: &[u8]) -> Result<()> {
        tokio::fs::create_dir_all(&self.root).await?;

        // Write-then-rename so readers never see a partial blob
        let final_path = self.blob_path(image_id);
        let tmp_path = self.root.join(format!("{}.tmp", image_id));
        tokio::fs::write(&tmp_path, bytes).await?;
        tokio::fs::rename(&tmp_path, &final_path).await?;

        Ok(())
    }

    async fn clear(&self) -> Result<usize> {
        let mut entries = match tokio::fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e.into()),
        };

        let mut removed = 0;
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_file() {
                tokio::fs::remove_file(entry.path()).await?;
                removed += 1;
            }
        }

        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_store_then_fetch() {
        let dir = TempDir::new().unwrap();
        let store = FsBlobStore::new(dir.path().join("blobs"));
        let id = Uuid::new_v4();

        store.store(id, b"fish").await.unwrap();
        assert_eq!(store.fetch(id).await.unwrap(), b"fish".to_vec());
        assert!(!dir.path().join("blobs").join(format!("{}.tmp", id)).exists());
    }

    #[tokio::test]
    async fn test_clear_removes_blobs() {
        let dir = TempDir::new().unwrap();
        let store = FsBlobStore::new(dir.path().join("blobs"));
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        store.store(a, b"one").await.unwrap();
        store.store(b, b"two").await.unwrap();

        assert_eq!(store.clear().await.unwrap(), 2);
        assert!(matches!(store.fetch(a).await, Err(Error::BlobMissing(_))));
        assert!(matches!(store.fetch(b).await, Err(Error::BlobMissing(_))));
    }

    #[tokio::test]
    async fn test_clear_without_root() {
        let dir = TempDir::new().unwrap();
        let store = FsBlobStore::new(dir.path().join("never-created"));
        assert_eq!(store.clear().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_missing_blob() {
        let dir = TempDir::new().unwrap();
        let store = FsBlobStore::new(dir.path());
        let id = Uuid::new_v4();

        match store.fetch(id).await {
            Err(Error::BlobMissing(missing)) => assert_eq!(missing, id),
            other => panic!("expected BlobMissing, got {:?}", other),
        }
    }
}
