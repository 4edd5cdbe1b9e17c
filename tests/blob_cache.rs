//! SQLite blob cache tests against a temp database.

use std::sync::Arc;

use realm::blob_cache::SqliteBlobCache;
use realm::config::Config;
use realm_core::blob::{BlobCache, BlobStore, CachedBlobs, MemoryBlobStore};
use tempfile::TempDir;

async fn open_cache(max_entries: usize) -> (TempDir, SqliteBlobCache) {
    let tmp = TempDir::new().unwrap();
    let mut config = Config::minimal();
    config.cache.path = tmp.path().join("data/realm.sqlite");
    config.cache.max_entries = max_entries;
    let cache = SqliteBlobCache::open(&config).await.unwrap();
    (tmp, cache)
}

#[tokio::test]
async fn test_put_then_get() {
    let (_tmp, cache) = open_cache(0).await;

    assert_eq!(cache.get("QmA").await.unwrap(), None);
    cache.put("QmA", b"hello").await.unwrap();
    assert_eq!(cache.get("QmA").await.unwrap(), Some(b"hello".to_vec()));
    assert_eq!(cache.len().await.unwrap(), 1);
}

#[tokio::test]
async fn test_entries_are_write_once() {
    let (_tmp, cache) = open_cache(0).await;

    cache.put("QmA", b"first").await.unwrap();
    cache.put("QmA", b"second").await.unwrap();
    assert_eq!(cache.get("QmA").await.unwrap(), Some(b"first".to_vec()));
    assert_eq!(cache.len().await.unwrap(), 1);
}

#[tokio::test]
async fn test_evicts_least_recently_used() {
    let (_tmp, cache) = open_cache(2).await;

    cache.put("a", b"1").await.unwrap();
    cache.put("b", b"2").await.unwrap();
    // Reading `a` makes `b` the oldest entry.
    cache.get("a").await.unwrap();
    cache.put("c", b"3").await.unwrap();

    assert_eq!(cache.len().await.unwrap(), 2);
    assert!(cache.contains("a").await.unwrap());
    assert!(!cache.contains("b").await.unwrap());
    assert!(cache.contains("c").await.unwrap());
}

#[tokio::test]
async fn test_zero_limit_keeps_everything() {
    let (_tmp, cache) = open_cache(0).await;

    for i in 0..50 {
        cache.put(&format!("h{i}"), b"x").await.unwrap();
    }
    assert_eq!(cache.len().await.unwrap(), 50);
}

#[tokio::test]
async fn test_survives_reopen() {
    let tmp = TempDir::new().unwrap();
    let mut config = Config::minimal();
    config.cache.path = tmp.path().join("realm.sqlite");

    {
        let cache = SqliteBlobCache::open(&config).await.unwrap();
        cache.put("QmA", b"kept").await.unwrap();
    }

    let cache = SqliteBlobCache::open(&config).await.unwrap();
    assert_eq!(cache.get("QmA").await.unwrap(), Some(b"kept".to_vec()));
}

#[tokio::test]
async fn test_read_through_hits_cache_on_second_fetch() {
    let (_tmp, cache) = open_cache(16).await;
    let store = Arc::new(MemoryBlobStore::new());
    let hash = store.store(b"# Note").await.unwrap();

    let blobs = CachedBlobs::new(store.clone(), Arc::new(cache));
    assert_eq!(blobs.fetch_text(&hash).await.unwrap(), "# Note");
    assert_eq!(blobs.fetch_text(&hash).await.unwrap(), "# Note");
    assert_eq!(store.fetch_count(), 1);
}

#[tokio::test]
async fn test_missing_blob_becomes_placeholder() {
    let (_tmp, cache) = open_cache(16).await;
    let blobs = CachedBlobs::new(Arc::new(MemoryBlobStore::new()), Arc::new(cache))
        .with_gateway("https://gw.example/ipfs/");

    assert_eq!(
        blobs.fetch_text_or_placeholder("QmGone").await,
        "Error loading note from IPFS [QmGone](https://gw.example/ipfs/QmGone)"
    );
}
