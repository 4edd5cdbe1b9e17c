use anyhow::Result;
use sqlx::SqlitePool;

use crate::config::Config;
use crate::db;

/// Create the cache schema in the configured database.
pub async fn run_migrations(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;
    apply(&pool).await?;
    pool.close().await;
    Ok(())
}

/// Idempotent schema setup on an open pool.
pub async fn apply(pool: &SqlitePool) -> Result<()> {
    // Content-addressed blobs. `accessed_at` is a logical clock, bumped on
    // every read and write, that orders eviction.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS blobs (
            hash TEXT PRIMARY KEY,
            content BLOB NOT NULL,
            size INTEGER NOT NULL,
            stored_at INTEGER NOT NULL,
            accessed_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_blobs_accessed_at ON blobs(accessed_at DESC)")
        .execute(pool)
        .await?;

    Ok(())
}
