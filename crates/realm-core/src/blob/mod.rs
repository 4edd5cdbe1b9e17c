//! Content-addressed blob access.
//!
//! Note bodies live in a content-addressed store: the key is derived from
//! the bytes, so a hash always maps to the same content and cached entries
//! never need invalidation. [`CachedBlobs`] puts a [`BlobCache`] in front of
//! a [`BlobStore`]: reads check the cache first, successful remote reads and
//! writes populate it. Cache failures are logged and bypassed.

pub mod memory;

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::error::{RealmError, Result};

pub use memory::{MemoryBlobCache, MemoryBlobStore};

/// Remote content-addressed store.
///
/// `fetch` reports unavailability as [`RealmError::ContentFetch`].
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store `content`, returning its content hash.
    async fn store(&self, content: &[u8]) -> Result<String>;

    async fn fetch(&self, hash: &str) -> Result<Vec<u8>>;
}

/// Local memo of previously fetched blobs, keyed by content hash.
///
/// Entries are immutable: `put` for an existing hash is a no-op.
#[async_trait]
pub trait BlobCache: Send + Sync {
    async fn get(&self, hash: &str) -> Result<Option<Vec<u8>>>;

    async fn put(&self, hash: &str, content: &[u8]) -> Result<()>;
}

pub const DEFAULT_GATEWAY: &str = "https://ipfs.io/ipfs";

/// Read-through cached blob access.
#[derive(Clone)]
pub struct CachedBlobs {
    store: Arc<dyn BlobStore>,
    cache: Arc<dyn BlobCache>,
    gateway: String,
}

impl CachedBlobs {
    pub fn new(store: Arc<dyn BlobStore>, cache: Arc<dyn BlobCache>) -> Self {
        Self {
            store,
            cache,
            gateway: DEFAULT_GATEWAY.to_string(),
        }
    }

    /// Base URL used in placeholder links, without trailing slash.
    pub fn with_gateway(mut self, gateway: impl Into<String>) -> Self {
        self.gateway = gateway.into().trim_end_matches('/').to_string();
        self
    }

    pub fn gateway_url(&self, hash: &str) -> String {
        format!("{}/{}", self.gateway, hash)
    }

    pub async fn store(&self, content: &[u8]) -> Result<String> {
        let hash = self.store.store(content).await?;
        if let Err(err) = self.cache.put(&hash, content).await {
            warn!(hash = %hash, error = %err, "could not cache stored blob");
        }
        Ok(hash)
    }

    pub async fn fetch(&self, hash: &str) -> Result<Vec<u8>> {
        if hash.trim().is_empty() {
            return Err(RealmError::validation("content hash is empty"));
        }

        match self.cache.get(hash).await {
            Ok(Some(bytes)) => {
                debug!(hash, "blob cache hit");
                return Ok(bytes);
            }
            Ok(None) => debug!(hash, "blob cache miss"),
            Err(err) => warn!(hash, error = %err, "blob cache read failed"),
        }

        let bytes = self.store.fetch(hash).await?;
        if let Err(err) = self.cache.put(hash, &bytes).await {
            warn!(hash, error = %err, "could not cache fetched blob");
        }
        Ok(bytes)
    }

    pub async fn fetch_text(&self, hash: &str) -> Result<String> {
        let bytes = self.fetch(hash).await?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Text for display: the blob, or a placeholder linking to the gateway.
    pub async fn fetch_text_or_placeholder(&self, hash: &str) -> String {
        match self.fetch_text(hash).await {
            Ok(text) => text,
            Err(err) => {
                warn!(hash, error = %err, "showing placeholder for unavailable content");
                self.placeholder(hash)
            }
        }
    }

    pub fn placeholder(&self, hash: &str) -> String {
        format!(
            "Error loading note from IPFS [{}]({})",
            hash,
            self.gateway_url(hash)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FetchErrorKind;

    fn blobs() -> (Arc<MemoryBlobStore>, CachedBlobs) {
        let store = Arc::new(MemoryBlobStore::new());
        let cached = CachedBlobs::new(store.clone(), Arc::new(MemoryBlobCache::new(16)));
        (store, cached)
    }

    #[tokio::test]
    async fn test_second_read_served_from_cache() {
        let (store, cached) = blobs();
        let hash = store.store(b"# Note").await.unwrap();

        assert_eq!(cached.fetch(&hash).await.unwrap(), b"# Note");
        assert_eq!(cached.fetch(&hash).await.unwrap(), b"# Note");
        assert_eq!(store.fetch_count(), 1);
    }

    #[tokio::test]
    async fn test_stored_blob_readable_without_fetch() {
        let (store, cached) = blobs();
        let hash = cached.store(b"body").await.unwrap();
        assert_eq!(cached.fetch_text(&hash).await.unwrap(), "body");
        assert_eq!(store.fetch_count(), 0);
    }

    #[tokio::test]
    async fn test_missing_blob_is_not_found() {
        let (_, cached) = blobs();
        let err = cached.fetch("nope").await.unwrap_err();
        assert_eq!(err, RealmError::content("nope", FetchErrorKind::NotFound));
    }

    #[tokio::test]
    async fn test_placeholder_on_failure() {
        let (_, cached) = blobs();
        let cached = cached.with_gateway("https://gw.example/ipfs/");
        let text = cached.fetch_text_or_placeholder("QmGone").await;
        assert_eq!(
            text,
            "Error loading note from IPFS [QmGone](https://gw.example/ipfs/QmGone)"
        );
    }

    #[tokio::test]
    async fn test_empty_hash_rejected() {
        let (store, cached) = blobs();
        assert!(cached.fetch(" ").await.unwrap_err().is_validation());
        assert_eq!(store.fetch_count(), 0);
    }
}
