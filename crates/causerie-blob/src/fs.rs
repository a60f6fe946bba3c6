//! Filesystem-backed blob store.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tracing::{debug, info};

use crate::error::BlobError;
use crate::BlobStore;

/// Verify that a resolved path stays within the expected base directory.
/// Prevents path traversal through attacker-chosen logical paths.
fn ensure_within(base: &Path, logical: &str) -> Result<PathBuf, BlobError> {
    if logical.is_empty() || logical.contains('\\') {
        return Err(BlobError::InvalidPath(logical.to_string()));
    }

    let canonical_base = base.canonicalize().unwrap_or_else(|_| base.to_path_buf());
    let mut resolved = canonical_base.clone();
    for component in Path::new(logical).components() {
        match component {
            std::path::Component::Normal(c) => resolved.push(c),
            std::path::Component::ParentDir => {
                return Err(BlobError::InvalidPath(logical.to_string()));
            }
            _ => {} // RootDir, CurDir, Prefix — skip
        }
    }
    if !resolved.starts_with(&canonical_base) {
        return Err(BlobError::InvalidPath(logical.to_string()));
    }
    Ok(resolved)
}

/// Blob store writing to a local directory tree.
///
/// Uploads land at `<base>/<logical path>` and are addressed back as
/// `file://` URLs.
#[derive(Debug, Clone)]
pub struct FsBlobStore {
    base_path: PathBuf,
    max_size: usize,
}

impl FsBlobStore {
    pub async fn new(base_path: PathBuf, max_size: usize) -> Result<Self, BlobError> {
        fs::create_dir_all(&base_path).await?;

        info!(path = %base_path.display(), max_size, "Blob store initialized");

        Ok(Self {
            base_path,
            max_size,
        })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn upload(&self, bytes: &[u8], path: &str) -> Result<String, BlobError> {
        if bytes.is_empty() {
            return Err(BlobError::Empty);
        }
        if bytes.len() > self.max_size {
            return Err(BlobError::TooLarge {
                size: bytes.len(),
                max: self.max_size,
            });
        }

        let resolved = ensure_within(&self.base_path, path)?;
        if let Some(parent) = resolved.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&resolved, bytes).await?;

        debug!(path = %resolved.display(), size = bytes.len(), "Stored blob");
        Ok(format!("file://{}", resolved.display()))
    }

    async fn fetch(&self, url: &str) -> Result<Vec<u8>, BlobError> {
        let path = url
            .strip_prefix("file://")
            .ok_or_else(|| BlobError::InvalidPath(url.to_string()))?;

        let path = PathBuf::from(path);
        let canonical_base = self
            .base_path
            .canonicalize()
            .unwrap_or_else(|_| self.base_path.clone());
        if !path.starts_with(&canonical_base) {
            return Err(BlobError::InvalidPath(url.to_string()));
        }
        if !path.exists() {
            return Err(BlobError::NotFound(url.to_string()));
        }

        let data = fs::read(&path).await?;

        debug!(path = %path.display(), size = data.len(), "Retrieved blob");
        Ok(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn test_store() -> (FsBlobStore, TempDir) {
        let dir = TempDir::new().unwrap();
        let store = FsBlobStore::new(dir.path().to_path_buf(), 1024 * 1024)
            .await
            .unwrap();
        (store, dir)
    }

    #[tokio::test]
    async fn test_upload_and_fetch() {
        let (store, _dir) = test_store().await;
        let data = b"attachment-bytes";

        let url = store
            .upload(data, "attachments/u1__u2/photo.jpg")
            .await
            .unwrap();
        assert!(url.starts_with("file://"));

        let retrieved = store.fetch(&url).await.unwrap();
        assert_eq!(retrieved, data);
    }

    #[tokio::test]
    async fn test_empty_blob_rejected() {
        let (store, _dir) = test_store().await;
        assert!(matches!(
            store.upload(b"", "x").await,
            Err(BlobError::Empty)
        ));
    }

    #[tokio::test]
    async fn test_size_cap() {
        let dir = TempDir::new().unwrap();
        let store = FsBlobStore::new(dir.path().to_path_buf(), 8).await.unwrap();

        assert!(matches!(
            store.upload(b"way too many bytes", "x").await,
            Err(BlobError::TooLarge { .. })
        ));
    }

    #[tokio::test]
    async fn test_traversal_rejected() {
        let (store, _dir) = test_store().await;
        assert!(store.upload(b"data", "../escape").await.is_err());
        assert!(store.fetch("file:///etc/passwd").await.is_err());
    }

    #[tokio::test]
    async fn test_fetch_missing_is_not_found() {
        let (store, _dir) = test_store().await;
        let missing = format!("file://{}/nothing-here", store.base_path().display());
        assert!(store.fetch(&missing).await.is_err());
    }
}
