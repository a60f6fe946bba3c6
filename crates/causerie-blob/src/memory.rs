//! In-memory blob store for tests and throwaway sessions.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::error::BlobError;
use crate::BlobStore;

/// Keeps uploaded blobs in a map, addressed as `mem:<path>` URLs.
#[derive(Clone, Default)]
pub struct MemoryBlobStore {
    blobs: Arc<Mutex<HashMap<String, Vec<u8>>>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.blobs.lock().map(|b| b.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn upload(&self, bytes: &[u8], path: &str) -> Result<String, BlobError> {
        if bytes.is_empty() {
            return Err(BlobError::Empty);
        }
        let url = format!("mem:{path}");
        self.blobs
            .lock()
            .map_err(|_| BlobError::InvalidPath(path.to_string()))?
            .insert(url.clone(), bytes.to_vec());
        Ok(url)
    }

    async fn fetch(&self, url: &str) -> Result<Vec<u8>, BlobError> {
        self.blobs
            .lock()
            .map_err(|_| BlobError::InvalidPath(url.to_string()))?
            .get(url)
            .cloned()
            .ok_or_else(|| BlobError::NotFound(url.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_round_trip() {
        let store = MemoryBlobStore::new();
        let url = store.upload(b"bytes", "a/b.jpg").await.unwrap();

        assert_eq!(url, "mem:a/b.jpg");
        assert_eq!(store.fetch(&url).await.unwrap(), b"bytes");
        assert!(store.fetch("mem:unknown").await.is_err());
    }
}
