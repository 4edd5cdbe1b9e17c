//! Persistent blob cache backed by SQLite.
//!
//! Blobs are keyed by content hash and never rewritten: a second `put` for
//! the same hash is ignored. With `max_entries > 0` the least recently
//! read or written blobs are evicted once the table grows past the limit.

use anyhow::Result as AnyResult;
use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;

use realm_core::blob::BlobCache;
use realm_core::{RealmError, Result};

use crate::config::Config;
use crate::{db, migrate};

const NEXT_TICK: &str = "(SELECT COALESCE(MAX(accessed_at), 0) + 1 FROM blobs)";

pub struct SqliteBlobCache {
    pool: SqlitePool,
    max_entries: usize,
}

fn cache_err(err: sqlx::Error) -> RealmError {
    RealmError::cache(err.to_string())
}

impl SqliteBlobCache {
    /// Open the configured cache database, creating the schema if needed.
    pub async fn open(config: &Config) -> AnyResult<Self> {
        let pool = db::connect(config).await?;
        migrate::apply(&pool).await?;
        Ok(Self::new(pool, config.cache.max_entries))
    }

    /// Wrap a pool whose schema is already in place.
    pub fn new(pool: SqlitePool, max_entries: usize) -> Self {
        Self { pool, max_entries }
    }

    pub async fn len(&self) -> AnyResult<usize> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM blobs")
            .fetch_one(&self.pool)
            .await?;
        Ok(count as usize)
    }

    pub async fn contains(&self, hash: &str) -> AnyResult<bool> {
        let found: Option<i64> = sqlx::query_scalar("SELECT 1 FROM blobs WHERE hash = ?")
            .bind(hash)
            .fetch_optional(&self.pool)
            .await?;
        Ok(found.is_some())
    }

    async fn evict(&self) -> Result<()> {
        if self.max_entries == 0 {
            return Ok(());
        }
        let removed = sqlx::query(
            "DELETE FROM blobs WHERE hash NOT IN \
             (SELECT hash FROM blobs ORDER BY accessed_at DESC LIMIT ?)",
        )
        .bind(self.max_entries as i64)
        .execute(&self.pool)
        .await
        .map_err(cache_err)?
        .rows_affected();
        if removed > 0 {
            debug!(removed, "evicted cached blobs");
        }
        Ok(())
    }
}

#[async_trait]
impl BlobCache for SqliteBlobCache {
    async fn get(&self, hash: &str) -> Result<Option<Vec<u8>>> {
        let content: Option<Vec<u8>> =
            sqlx::query_scalar("SELECT content FROM blobs WHERE hash = ?")
                .bind(hash)
                .fetch_optional(&self.pool)
                .await
                .map_err(cache_err)?;

        if content.is_some() {
            sqlx::query(&format!(
                "UPDATE blobs SET accessed_at = {NEXT_TICK} WHERE hash = ?"
            ))
            .bind(hash)
            .execute(&self.pool)
            .await
            .map_err(cache_err)?;
        }
        Ok(content)
    }

    async fn put(&self, hash: &str, content: &[u8]) -> Result<()> {
        let inserted = sqlx::query(&format!(
            "INSERT OR IGNORE INTO blobs (hash, content, size, stored_at, accessed_at) \
             VALUES (?, ?, ?, ?, {NEXT_TICK})"
        ))
        .bind(hash)
        .bind(content)
        .bind(content.len() as i64)
        .bind(Utc::now().timestamp_millis())
        .execute(&self.pool)
        .await
        .map_err(cache_err)?
        .rows_affected();

        if inserted > 0 {
            self.evict().await?;
        }
        Ok(())
    }
}
