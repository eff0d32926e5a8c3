//! Response cache shared by the planning adapters
//!
//! Caching is an optimization only. Callers treat every `CacheError` as a miss
//! or a skipped write.

use crate::error::CacheError;
use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::io::Write;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{info, warn};

pub mod postgres;
pub use postgres::PostgresCacheStore;

pub type CacheResult<T> = std::result::Result<T, CacheError>;

/// Expired entries are swept on every Nth write
pub const SWEEP_EVERY_WRITES: u64 = 128;

pub(crate) fn sweep_due(writes: u64) -> bool {
    writes > 0 && writes % SWEEP_EVERY_WRITES == 0
}

/// Key/value store with expiring entries
#[async_trait::async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> CacheResult<Option<Value>>;
    async fn set(&self, key: &str, value: &Value, ttl_secs: u64) -> CacheResult<()>;
}

struct Entry {
    value: Value,
    expires_at: Instant,
}

/// In-process cache for development and single-instance deployments
///
/// Stale entries are dropped when read, and swept in bulk every
/// `SWEEP_EVERY_WRITES` writes so keys that are never read again go too.
pub struct InMemoryCacheStore {
    entries: Arc<RwLock<HashMap<String, Entry>>>,
    writes: AtomicU64,
}

impl InMemoryCacheStore {
    pub fn new() -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            writes: AtomicU64::new(0),
        }
    }

    /// Number of stored entries, expired ones included until read or swept
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Sweep now instead of waiting for the write schedule. Returns how many were removed.
    pub async fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| entry.expires_at > now);
        before - entries.len()
    }
}

impl Default for InMemoryCacheStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl CacheStore for InMemoryCacheStore {
    async fn get(&self, key: &str) -> CacheResult<Option<Value>> {
        {
            let entries = self.entries.read().await;
            match entries.get(key) {
                None => return Ok(None),
                Some(entry) if entry.expires_at > Instant::now() => {
                    return Ok(Some(entry.value.clone()));
                }
                Some(_) => {}
            }
        }

        // Stale: re-check under the write lock, a concurrent set may have refreshed it
        let mut entries = self.entries.write().await;
        let now = Instant::now();
        match entries.get(key) {
            Some(entry) if entry.expires_at > now => Ok(Some(entry.value.clone())),
            Some(_) => {
                entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: &Value, ttl_secs: u64) -> CacheResult<()> {
        let expires_at = Instant::now()
            .checked_add(Duration::from_secs(ttl_secs))
            .ok_or_else(|| CacheError::Backend(format!("ttl {}s out of range", ttl_secs)))?;

        let writes = self.writes.fetch_add(1, Ordering::Relaxed) + 1;

        let mut entries = self.entries.write().await;
        if sweep_due(writes) {
            let now = Instant::now();
            entries.retain(|_, entry| entry.expires_at > now);
        }
        entries.insert(
            key.to_string(),
            Entry {
                value: value.clone(),
                expires_at,
            },
        );
        Ok(())
    }
}

/// Pick the cache backend: Postgres when a database URL is configured, otherwise in-memory
pub fn build_cache_store() -> Arc<dyn CacheStore> {
    let database_url = std::env::var("POSTGRES_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .ok();

    if let Some(url) = database_url {
        match PostgresCacheStore::connect_lazy(&url) {
            Ok(store) => {
                info!("Planning cache backend: postgres");
                return Arc::new(store);
            }
            Err(error) => {
                warn!(
                    "Failed to initialize postgres cache backend, falling back to in-memory: {}",
                    error
                );
            }
        }
    }

    info!("Planning cache backend: in-memory");
    Arc::new(InMemoryCacheStore::new())
}

//
// ================= Keys =================
//

/// `<prefix>:<operation>:<discriminator>`
pub fn cache_key(prefix: &str, operation: &str, discriminator: &str) -> String {
    format!("{}:{}:{}", prefix, operation, discriminator)
}

/// SHA256 hex of the canonical JSON form of `value`.
/// Struct fields serialize in declaration order, so equal inputs give equal digests.
pub fn fingerprint<T: Serialize>(value: &T) -> CacheResult<String> {
    let mut hasher = Sha256::new();
    serde_json::to_writer(&mut HashWriter(&mut hasher), value)?;
    Ok(hex::encode(hasher.finalize()))
}

/// Adapter to allow writing into Sha256 via std::io::Write
struct HashWriter<'a, H: Digest>(&'a mut H);

impl<'a, H: Digest> Write for HashWriter<'a, H> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.update(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}
