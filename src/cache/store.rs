//! SQLite persistent tier of the valuation cache.

use crate::domain::TimeMs;
use sqlx::sqlite::{SqliteConnection, SqlitePool, SqlitePoolOptions};
use sqlx::Row;
use std::io::{Read, Write};
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info};

/// Failures of the persistent tier. These never leave the cache: callers log
/// them and carry on with the memory tier.
#[derive(Debug, Error)]
pub enum CacheStoreError {
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),

    #[error("payload compression error: {0}")]
    Compression(String),

    #[error("payload decompression error: {0}")]
    Decompression(String),
}

/// A persisted entry as read back from disk: uncompressed JSON plus expiry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredEntry {
    pub json: Vec<u8>,
    pub expires_at: Option<TimeMs>,
}

/// Handle on the `cache_entries` table. Cloning shares the pool.
#[derive(Debug, Clone)]
pub struct PersistentStore {
    pool: SqlitePool,
}

impl PersistentStore {
    /// Open (creating if needed) the SQLite file and apply the schema.
    pub async fn open(db_path: &str) -> Result<Self, CacheStoreError> {
        if let Some(parent) = Path::new(db_path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).ok();
            }
        }

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .after_connect(|conn, _meta| {
                Box::pin(async move { configure_pragmas_conn(conn).await })
            })
            .connect(&format!("sqlite:{}?mode=rwc", db_path))
            .await?;

        run_migrations(&pool).await?;

        info!(path = %db_path, "Cache store initialized");
        Ok(Self { pool })
    }

    /// Insert or replace an entry. `json` is the uncompressed payload.
    pub async fn put(
        &self,
        key: &str,
        json: &[u8],
        expires_at: Option<TimeMs>,
        now: TimeMs,
    ) -> Result<(), CacheStoreError> {
        let payload = compress(json)?;
        let size_bytes = i64::try_from(json.len()).unwrap_or(i64::MAX);

        sqlx::query(
            r#"
            INSERT INTO cache_entries (key, payload, size_bytes, expires_at_ms, stored_at_ms)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(key) DO UPDATE SET
                payload = excluded.payload,
                size_bytes = excluded.size_bytes,
                expires_at_ms = excluded.expires_at_ms,
                stored_at_ms = excluded.stored_at_ms
            "#,
        )
        .bind(key)
        .bind(payload)
        .bind(size_bytes)
        .bind(expires_at.map(|t| t.as_i64()))
        .bind(now.as_i64())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Read a live entry. An expired row is deleted and reported as absent.
    pub async fn get(
        &self,
        key: &str,
        now: TimeMs,
    ) -> Result<Option<StoredEntry>, CacheStoreError> {
        let row = sqlx::query("SELECT payload, expires_at_ms FROM cache_entries WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let expires_at: Option<i64> = row.try_get("expires_at_ms")?;
        let expires_at = expires_at.map(TimeMs::new);
        if expires_at.is_some_and(|t| now >= t) {
            debug!(key = %key, "Purging expired persisted entry");
            self.remove(key).await?;
            return Ok(None);
        }

        let payload: Vec<u8> = row.try_get("payload")?;
        Ok(Some(StoredEntry {
            json: decompress(&payload)?,
            expires_at,
        }))
    }

    pub async fn remove(&self, key: &str) -> Result<bool, CacheStoreError> {
        let result = sqlx::query("DELETE FROM cache_entries WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete every entry, or only keys starting with `prefix`.
    pub async fn clear(&self, prefix: Option<&str>) -> Result<u64, CacheStoreError> {
        let result = match prefix {
            None => sqlx::query("DELETE FROM cache_entries").execute(&self.pool).await?,
            Some(prefix) => {
                sqlx::query("DELETE FROM cache_entries WHERE substr(key, 1, length(?)) = ?")
                    .bind(prefix)
                    .bind(prefix)
                    .execute(&self.pool)
                    .await?
            }
        };
        Ok(result.rows_affected())
    }

    pub async fn len(&self) -> Result<i64, CacheStoreError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM cache_entries")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    let schema_sql = include_str!("schema.sql");

    for statement in schema_sql.split(';') {
        let trimmed = statement.trim();
        // Skip comment-only fragments.
        if trimmed.lines().all(|l| l.trim().is_empty() || l.trim().starts_with("--")) {
            continue;
        }
        sqlx::query(trimmed).execute(pool).await?;
    }

    Ok(())
}

async fn configure_pragmas_conn(conn: &mut SqliteConnection) -> Result<(), sqlx::Error> {
    // journal_mode returns the actual mode set; must use fetch to get result
    let row = sqlx::query("PRAGMA journal_mode = WAL")
        .fetch_one(&mut *conn)
        .await?;
    let journal_mode: String = row.get(0);
    debug!(journal_mode = %journal_mode, "SQLite journal mode");

    sqlx::query("PRAGMA busy_timeout = 5000")
        .execute(&mut *conn)
        .await?;
    sqlx::query("PRAGMA synchronous = NORMAL")
        .execute(&mut *conn)
        .await?;

    Ok(())
}

fn compress(input: &[u8]) -> Result<Vec<u8>, CacheStoreError> {
    let mut encoder = lz4_flex::frame::FrameEncoder::new(Vec::new());
    encoder
        .write_all(input)
        .map_err(|e| CacheStoreError::Compression(e.to_string()))?;
    encoder
        .finish()
        .map_err(|e| CacheStoreError::Compression(e.to_string()))
}

fn decompress(input: &[u8]) -> Result<Vec<u8>, CacheStoreError> {
    let mut decoder = lz4_flex::frame::FrameDecoder::new(input);
    let mut out = Vec::new();
    decoder
        .read_to_end(&mut out)
        .map_err(|e| CacheStoreError::Decompression(e.to_string()))?;
    Ok(out)
}
