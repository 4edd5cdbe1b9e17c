//! In-memory blob store and bounded LRU blob cache for tests and WASM.

use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError, RwLock};

use async_trait::async_trait;
use lru::LruCache;
use sha2::{Digest, Sha256};

use super::{BlobCache, BlobStore};
use crate::error::{FetchErrorKind, RealmError, Result};

/// SHA-256 hex of `content`, used as the content address.
pub fn content_hash(content: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content);
    format!("{:x}", hasher.finalize())
}

/// Blob store addressing content by SHA-256.
#[derive(Default)]
pub struct MemoryBlobStore {
    blobs: RwLock<HashMap<String, Vec<u8>>>,
    fetches: AtomicUsize,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `fetch` calls served so far.
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn store(&self, content: &[u8]) -> Result<String> {
        let hash = content_hash(content);
        self.blobs
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(hash.clone())
            .or_insert_with(|| content.to_vec());
        Ok(hash)
    }

    async fn fetch(&self, hash: &str) -> Result<Vec<u8>> {
        self.fetches.fetch_add(1, Ordering::Relaxed);
        self.blobs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(hash)
            .cloned()
            .ok_or_else(|| RealmError::content(hash, FetchErrorKind::NotFound))
    }
}

/// LRU-bounded blob cache. Reads refresh recency.
pub struct MemoryBlobCache {
    entries: Mutex<LruCache<String, Vec<u8>>>,
}

impl MemoryBlobCache {
    /// A capacity of 0 means unbounded.
    pub fn new(capacity: usize) -> Self {
        let cache = match NonZeroUsize::new(capacity) {
            Some(cap) => LruCache::new(cap),
            None => LruCache::unbounded(),
        };
        Self {
            entries: Mutex::new(cache),
        }
    }

    pub fn unbounded() -> Self {
        Self::new(0)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl BlobCache for MemoryBlobCache {
    async fn get(&self, hash: &str) -> Result<Option<Vec<u8>>> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(entries.get(hash).cloned())
    }

    async fn put(&self, hash: &str, content: &[u8]) -> Result<()> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        if !entries.contains(hash) {
            entries.put(hash.to_string(), content.to_vec());
        }
        Ok(())
    }
}
