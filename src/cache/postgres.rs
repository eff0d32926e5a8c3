//! Postgres-backed response cache
//!
//! Shared across gateway replicas. Expired rows are ignored on read and
//! deleted in bulk every `SWEEP_EVERY_WRITES` writes.

use super::{sweep_due, CacheResult, CacheStore};
use crate::error::CacheError;
use serde_json::Value;
use sqlx::{PgPool, Row};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{debug, warn};

pub struct PostgresCacheStore {
    pool: PgPool,
    schema_ready: Arc<OnceCell<()>>,
    writes: AtomicU64,
}

impl PostgresCacheStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            schema_ready: Arc::new(OnceCell::new()),
            writes: AtomicU64::new(0),
        }
    }

    /// Build a lazily-connecting pool; no I/O happens until the first query
    pub fn connect_lazy(url: &str) -> CacheResult<Self> {
        let pool = sqlx::postgres::PgPoolOptions::new()
            .max_connections(5)
            .connect_lazy(url)?;
        Ok(Self::new(pool))
    }

    /// Delete expired rows, returning how many went
    pub async fn purge_expired(&self) -> CacheResult<u64> {
        self.ensure_schema().await?;

        let result = sqlx::query("DELETE FROM planning_cache WHERE expires_at <= NOW()")
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    async fn ensure_schema(&self) -> CacheResult<()> {
        self.schema_ready
            .get_or_try_init(|| async {
                sqlx::query(
                    r#"
                    CREATE TABLE IF NOT EXISTS planning_cache (
                      cache_key TEXT PRIMARY KEY,
                      payload JSONB NOT NULL,
                      expires_at TIMESTAMPTZ NOT NULL,
                      updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
                    );
                    "#,
                )
                .execute(&self.pool)
                .await?;

                sqlx::query(
                    r#"
                    CREATE INDEX IF NOT EXISTS idx_planning_cache_expires
                    ON planning_cache (expires_at);
                    "#,
                )
                .execute(&self.pool)
                .await?;

                Ok::<(), sqlx::Error>(())
            })
            .await
            .map_err(|e| CacheError::Backend(format!("Failed to initialize planning cache schema: {}", e)))?;

        Ok(())
    }
}

#[async_trait::async_trait]
impl CacheStore for PostgresCacheStore {
    async fn get(&self, key: &str) -> CacheResult<Option<Value>> {
        self.ensure_schema().await?;

        let row = sqlx::query(
            r#"
            SELECT payload
            FROM planning_cache
            WHERE cache_key = $1 AND expires_at > NOW()
            "#,
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => {
                let payload: Value = row.try_get("payload")?;
                Ok(Some(payload))
            }
            None => {
                debug!(cache_key = %key, "No live cache row");
                Ok(None)
            }
        }
    }

    async fn set(&self, key: &str, value: &Value, ttl_secs: u64) -> CacheResult<()> {
        self.ensure_schema().await?;

        let ttl_secs = i64::try_from(ttl_secs)
            .map_err(|_| CacheError::Backend(format!("ttl {}s out of range", ttl_secs)))?;

        sqlx::query(
            r#"
            INSERT INTO planning_cache (cache_key, payload, expires_at, updated_at)
            VALUES ($1, $2, NOW() + make_interval(secs => $3), NOW())
            ON CONFLICT (cache_key)
            DO UPDATE SET payload = EXCLUDED.payload,
                          expires_at = EXCLUDED.expires_at,
                          updated_at = NOW()
            "#,
        )
        .bind(key)
        .bind(value)
        .bind(ttl_secs as f64)
        .execute(&self.pool)
        .await?;

        let writes = self.writes.fetch_add(1, Ordering::Relaxed) + 1;
        if sweep_due(writes) {
            match self.purge_expired().await {
                Ok(removed) => debug!(removed, "Swept expired cache rows"),
                // The write itself succeeded
                Err(e) => warn!("Expired cache sweep failed: {}", e),
            }
        }

        Ok(())
    }
}
