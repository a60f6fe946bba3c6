//! # causerie-blob
//!
//! Blob storage seam for message attachments.
//!
//! The conversation core never handles image bytes beyond handing them to a
//! [`BlobStore`] and embedding the returned URL in a message.  Two
//! implementations ship here: [`FsBlobStore`] (local filesystem, size-capped,
//! traversal-guarded) and [`MemoryBlobStore`] for tests.

pub mod fs;
pub mod memory;

mod error;

use async_trait::async_trait;

pub use error::BlobError;
pub use fs::FsBlobStore;
pub use memory::MemoryBlobStore;

/// Binary upload target returning retrievable URLs.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store `bytes` under the given logical path and return a URL from which
    /// the same bytes can later be fetched.
    async fn upload(&self, bytes: &[u8], path: &str) -> Result<String, BlobError>;

    /// Fetch the bytes behind a URL previously returned by [`BlobStore::upload`].
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, BlobError>;
}
