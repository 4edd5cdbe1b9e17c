//! `realm cat` and `realm publish`: blob reads and the publish-note flow.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};

use realm_core::blob::CachedBlobs;
use realm_core::service::{RealmService, Session};

use crate::blob_cache::SqliteBlobCache;
use crate::config::Config;
use crate::inspect::read_input;
use crate::ipfs::HttpBlobStore;
use crate::remote::{HttpEventClient, HttpQueryClient};

/// Blob store behind the persistent cache, with the configured gateway.
pub async fn blob_layer(config: &Config) -> Result<CachedBlobs> {
    let store = Arc::new(HttpBlobStore::new(&config.blobs)?);
    let cache = Arc::new(SqliteBlobCache::open(config).await?);
    Ok(CachedBlobs::new(store, cache).with_gateway(&config.blobs.gateway_url))
}

pub async fn run_cat(config: &Config, hash: &str) -> Result<()> {
    let blobs = blob_layer(config).await?;
    let text = blobs
        .fetch_text(hash)
        .await
        .with_context(|| format!("Failed to load {}", blobs.gateway_url(hash)))?;
    print!("{}", text);
    Ok(())
}

pub async fn run_publish(config: &Config, input: &Path, signer: &str) -> Result<()> {
    let markdown = read_input(input)?;
    let service = RealmService::new(
        Session::signed_in(signer),
        Arc::new(HttpQueryClient::new(&config.server)?),
        Arc::new(HttpEventClient::new(&config.server)?),
        blob_layer(config).await?,
        config.feeds.page_size,
    );

    let note = service.publish_note(&markdown).await?;
    println!("{}", serde_json::to_string_pretty(&note)?);
    Ok(())
}
