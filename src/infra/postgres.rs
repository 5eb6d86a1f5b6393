//! Postgres-backed persistent tier.
//!
//! Entries live in the `cache_entries` table created by `migrations/`.
//! Expiry deadlines are computed and compared with the database clock, so
//! every process sharing the table agrees on what has expired.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use bytes::Bytes;
use sqlx::{
    postgres::{PgPool, PgPoolOptions},
    query, query_as,
};
use tracing::info;

use crate::cache::{BackingStoreError, CacheKey, PersistentStore, StoredValue};

const STORE: &str = "postgres";

#[derive(Clone)]
pub struct PostgresBackingStore {
    pool: Arc<PgPool>,
}

impl PostgresBackingStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn connect(url: &str, max_connections: u32) -> Result<PgPool, sqlx::Error> {
        PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await
    }

    pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
        sqlx::migrate!("./migrations")
            .run(pool)
            .await
            .map_err(Into::into)
    }

    pub async fn health_check(&self) -> Result<(), BackingStoreError> {
        query("SELECT 1")
            .execute(self.pool())
            .await
            .map(|_| ())
            .map_err(map_sqlx_error)
    }

    /// Delete rows whose deadline has passed, returning how many were removed.
    ///
    /// Expired rows are already invisible to `get`; this only reclaims space.
    pub async fn purge_expired(&self) -> Result<u64, BackingStoreError> {
        let result = query("DELETE FROM cache_entries WHERE expires_at IS NOT NULL AND expires_at <= now()")
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        let purged = result.rows_affected();
        info!(store = STORE, purged, "purged expired cache entries");
        Ok(purged)
    }
}

#[async_trait]
impl PersistentStore for PostgresBackingStore {
    fn name(&self) -> &'static str {
        STORE
    }

    async fn get(&self, key: &CacheKey) -> Result<Option<StoredValue>, BackingStoreError> {
        let row: Option<(Vec<u8>, Option<f64>)> = query_as(
            "SELECT value, EXTRACT(EPOCH FROM (expires_at - now()))::float8 \
             FROM cache_entries \
             WHERE key = $1 AND (expires_at IS NULL OR expires_at > now())",
        )
        .bind(key.as_str())
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(|(value, remaining)| {
            StoredValue::new(Bytes::from(value), remaining.map(remaining_ttl))
        }))
    }

    async fn set(
        &self,
        key: &CacheKey,
        value: Bytes,
        ttl: Option<Duration>,
    ) -> Result<(), BackingStoreError> {
        // NULL seconds propagate to a NULL deadline, i.e. no expiry.
        let ttl_seconds = ttl.map(|ttl| ttl.as_secs_f64());
        query(
            "INSERT INTO cache_entries (key, value, expires_at, updated_at) \
             VALUES ($1, $2, now() + ($3::float8 * interval '1 second'), now()) \
             ON CONFLICT (key) DO UPDATE \
             SET value = EXCLUDED.value, expires_at = EXCLUDED.expires_at, updated_at = now()",
        )
        .bind(key.as_str())
        .bind(value.as_ref())
        .bind(ttl_seconds)
        .execute(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(())
    }

    async fn delete(&self, key: &CacheKey) -> Result<(), BackingStoreError> {
        query("DELETE FROM cache_entries WHERE key = $1")
            .bind(key.as_str())
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Ok(())
    }

    async fn clear_all(&self) -> Result<(), BackingStoreError> {
        query("DELETE FROM cache_entries")
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Ok(())
    }
}

/// Seconds left on a row, as reported by the database, clamped at zero.
fn remaining_ttl(seconds: f64) -> Duration {
    Duration::try_from_secs_f64(seconds.max(0.0)).unwrap_or(Duration::ZERO)
}

pub fn map_sqlx_error(err: sqlx::Error) -> BackingStoreError {
    match err {
        sqlx::Error::PoolTimedOut => BackingStoreError::timeout(STORE, err.to_string()),
        sqlx::Error::Io(_)
        | sqlx::Error::Tls(_)
        | sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed => BackingStoreError::connection(STORE, err.to_string()),
        sqlx::Error::Decode(_) | sqlx::Error::ColumnDecode { .. } | sqlx::Error::Encode(_) => {
            BackingStoreError::serialization(STORE, err.to_string())
        }
        sqlx::Error::Database(db) if db.message().contains("canceling statement due to") => {
            BackingStoreError::timeout(STORE, db.message().to_string())
        }
        other => BackingStoreError::other(STORE, other.to_string()),
    }
}
