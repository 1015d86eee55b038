//! Content-addressed storage for uploaded file bodies
//!
//! File records in SQLite only carry a `content_hash`; the bytes live here,
//! named by their SHA256 hash and fanned out over two-level subdirectories.

use crate::error::StorageError;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

/// Result of storing a blob
#[derive(Debug, Clone)]
pub struct StoreResult {
    /// SHA256 hash of the blob
    pub hash: String,
    /// Total size in bytes
    pub size_bytes: u64,
    /// Whether blob already existed
    pub already_existed: bool,
}

/// Blob storage manager
pub struct BlobStore {
    root_dir: PathBuf,
}

impl BlobStore {
    /// Create a new blob store at the given directory
    pub async fn new<P: AsRef<Path>>(root_dir: P) -> Result<Self, StorageError> {
        let root_dir = root_dir.as_ref().to_path_buf();
        fs::create_dir_all(&root_dir).await?;

        info!(path = %root_dir.display(), "Initialized blob store");

        Ok(Self { root_dir })
    }

    /// Compute SHA256 hash of data
    pub fn compute_hash(data: &[u8]) -> String {
        let mut hasher = Sha256::new();
        hasher.update(data);
        format!("sha256-{}", hex::encode(hasher.finalize()))
    }

    fn blob_path(&self, hash: &str) -> PathBuf {
        let hash_part = hash.strip_prefix("sha256-").unwrap_or(hash);
        let subdir = &hash_part[..4.min(hash_part.len())];
        self.root_dir.join(subdir).join(hash)
    }

    /// Store a blob, returning its hash. Storing identical bytes twice is a no-op.
    pub async fn store(&self, data: &[u8]) -> Result<StoreResult, StorageError> {
        let hash = Self::compute_hash(data);
        let path = self.blob_path(&hash);

        if self.exists(&hash).await {
            debug!(hash = %hash, "Blob already exists");
            return Ok(StoreResult {
                hash,
                size_bytes: data.len() as u64,
                already_existed: true,
            });
        }

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&path, data).await?;

        info!(hash = %hash, size = data.len(), "Stored blob");

        Ok(StoreResult {
            hash,
            size_bytes: data.len() as u64,
            already_existed: false,
        })
    }

    /// Read a local file and store its contents
    pub async fn store_file<P: AsRef<Path>>(&self, source: P) -> Result<StoreResult, StorageError> {
        let data = fs::read(source.as_ref()).await?;
        self.store(&data).await
    }

    /// Check if a blob exists
    pub async fn exists(&self, hash: &str) -> bool {
        fs::metadata(self.blob_path(hash)).await.is_ok()
    }

    /// Retrieve a blob by hash, verifying its content
    pub async fn get(&self, hash: &str) -> Result<Vec<u8>, StorageError> {
        let path = self.blob_path(hash);
        if fs::metadata(&path).await.is_err() {
            return Err(StorageError::BlobNotFound(hash.to_string()));
        }

        let data = fs::read(&path).await?;
        let actual = Self::compute_hash(&data);
        if actual != hash {
            return Err(StorageError::HashMismatch {
                expected: hash.to_string(),
                actual,
            });
        }

        Ok(data)
    }

    /// Delete a blob; deleting a missing blob succeeds
    pub async fn delete(&self, hash: &str) -> Result<(), StorageError> {
        fs::remove_file(self.blob_path(hash)).await.ok();
        info!(hash = %hash, "Deleted blob");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_store_and_retrieve() {
        let temp_dir = TempDir::new().unwrap();
        let store = BlobStore::new(temp_dir.path()).await.unwrap();

        let data = b"\x89PNG fake image";
        let result = store.store(data).await.unwrap();

        assert!(result.hash.starts_with("sha256-"));
        assert_eq!(result.size_bytes, data.len() as u64);
        assert!(!result.already_existed);
        assert!(store.exists(&result.hash).await);

        let retrieved = store.get(&result.hash).await.unwrap();
        assert_eq!(retrieved, data);
    }

    #[tokio::test]
    async fn test_idempotent_store() {
        let temp_dir = TempDir::new().unwrap();
        let store = BlobStore::new(temp_dir.path()).await.unwrap();

        let first = store.store(b"same bytes").await.unwrap();
        let second = store.store(b"same bytes").await.unwrap();

        assert_eq!(first.hash, second.hash);
        assert!(second.already_existed);
    }

    #[tokio::test]
    async fn test_store_file_and_delete() {
        let temp_dir = TempDir::new().unwrap();
        let store = BlobStore::new(temp_dir.path().join("blobs")).await.unwrap();

        let source = temp_dir.path().join("avatar.png");
        std::fs::write(&source, b"avatar").unwrap();

        let result = store.store_file(&source).await.unwrap();
        assert_eq!(result.hash, BlobStore::compute_hash(b"avatar"));

        store.delete(&result.hash).await.unwrap();
        assert!(!store.exists(&result.hash).await);
        assert!(matches!(
            store.get(&result.hash).await,
            Err(StorageError::BlobNotFound(_))
        ));
    }

    #[test]
    fn test_compute_hash() {
        let hash = BlobStore::compute_hash(b"test");
        assert!(hash.starts_with("sha256-"));
        assert_eq!(hash.len(), 7 + 64);
    }
}
