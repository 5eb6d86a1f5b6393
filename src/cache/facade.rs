//! The memory-first cache facade.
//!
//! Reads consult the memory tier first and fall through to the persistent
//! tier, populating memory on a persistent hit. Writes go to the persistent
//! tier first and only touch memory once the persistent tier has accepted
//! them. Persistent-tier failures are returned to the caller untouched.

use std::{fmt, future::Future, sync::Arc, time::Duration, time::Instant};

use bytes::Bytes;
use metrics::histogram;
use serde::{Serialize, de::DeserializeOwned};
use tracing::{debug, info, warn};

use super::config::CacheConfig;
use super::error::{BackingStoreError, CacheError};
use super::keys::CacheKey;
use super::memory::{MemoryStore, ShardedLruStore};
use super::persistent::{PersistentStore, StoredValue};
use super::stats::{CacheStats, StatsRecorder};

const METRIC_BACKING_MS: &str = "memfirst_cache_backing_ms";

/// Two-tier read-through cache.
///
/// Cloning is cheap and clones share both tiers and the counters.
///
/// ```ignore
/// let cache = MemoryFirstCache::with_backing(Arc::new(LocalBackingStore::new()), CacheConfig::default());
/// let key = CacheKey::new("user:42")?;
/// cache.set(&key, "Ada").await?;
/// assert_eq!(cache.get(&key).await?, Some(Bytes::from("Ada")));
/// ```
#[derive(Clone)]
pub struct MemoryFirstCache {
    memory: Arc<dyn MemoryStore>,
    persistent: Arc<dyn PersistentStore>,
    config: CacheConfig,
    stats: Arc<StatsRecorder>,
}

impl MemoryFirstCache {
    pub fn new(
        memory: Arc<dyn MemoryStore>,
        persistent: Arc<dyn PersistentStore>,
        config: CacheConfig,
    ) -> Self {
        Self {
            memory,
            persistent,
            config,
            stats: Arc::new(StatsRecorder::default()),
        }
    }

    /// Front `persistent` with a [`ShardedLruStore`] shaped by `config`.
    pub fn with_backing(persistent: Arc<dyn PersistentStore>, config: CacheConfig) -> Self {
        let memory = Arc::new(ShardedLruStore::new(&config));
        Self::new(memory, persistent, config)
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// The memory tier, for inspection.
    pub fn memory(&self) -> &dyn MemoryStore {
        self.memory.as_ref()
    }

    pub fn persistent(&self) -> &dyn PersistentStore {
        self.persistent.as_ref()
    }

    pub fn stats(&self) -> CacheStats {
        self.stats.snapshot()
    }

    /// Look up `key`, returning `Ok(None)` when neither tier has it.
    ///
    /// A persistent hit is copied into the memory tier, expiring no later than
    /// the persistent entry. A persistent miss is not remembered, so the next
    /// read asks the persistent tier again.
    pub async fn get(&self, key: &CacheKey) -> Result<Option<Bytes>, CacheError> {
        if let Some(value) = self.memory.get(key)? {
            self.stats.memory_hit();
            debug!(key = %key, tier = "memory", "cache hit");
            return Ok(Some(value));
        }
        self.stats.memory_miss();

        let fetched = self
            .call_backing("get", Some(key), self.persistent.get(key))
            .await?;

        match fetched {
            Some(StoredValue { value, ttl }) => {
                self.stats.backing_hit();
                let ttl = shorter_ttl(ttl, self.config.default_ttl);
                self.memory.set(key.clone(), value.clone(), ttl)?;
                debug!(key = %key, tier = "persistent", ttl = ?ttl, "cache hit, memory tier populated");
                Ok(Some(value))
            }
            None => {
                self.stats.backing_miss();
                debug!(key = %key, "cache miss");
                Ok(None)
            }
        }
    }

    /// Whether `key` is present in either tier.
    ///
    /// Checks memory first and then the persistent tier. A persistent hit is
    /// not copied into memory.
    pub async fn contains(&self, key: &CacheKey) -> Result<bool, CacheError> {
        if self.memory.contains(key) {
            return Ok(true);
        }
        let stored = self
            .call_backing("get", Some(key), self.persistent.get(key))
            .await?;
        Ok(stored.is_some())
    }

    /// Store `value` under `key` using the configured default lifetime.
    pub async fn set(&self, key: &CacheKey, value: impl Into<Bytes>) -> Result<(), CacheError> {
        self.write(key, value.into(), self.config.default_ttl).await
    }

    /// Store `value` under `key`, expiring after `ttl` in both tiers.
    pub async fn set_with_ttl(
        &self,
        key: &CacheKey,
        value: impl Into<Bytes>,
        ttl: Duration,
    ) -> Result<(), CacheError> {
        self.write(key, value.into(), Some(ttl)).await
    }

    /// Remove `key` from both tiers. Absent keys are fine.
    pub async fn delete(&self, key: &CacheKey) -> Result<(), CacheError> {
        self.call_backing("delete", Some(key), self.persistent.delete(key))
            .await?;
        self.memory.delete(key)?;
        debug!(key = %key, "cache entry deleted");
        Ok(())
    }

    /// Empty both tiers.
    ///
    /// When the persistent tier refuses, the memory tier is left as it was.
    pub async fn clear(&self) -> Result<(), CacheError> {
        self.call_backing("clear_all", None, self.persistent.clear_all())
            .await?;
        self.memory.clear_all()?;
        info!(
            persistent = self.persistent.name(),
            memory = self.memory.name(),
            "cache cleared"
        );
        Ok(())
    }

    /// Empty the memory tier only; later reads refill it from the persistent tier.
    pub fn reset_memory_store(&self) -> Result<(), CacheError> {
        self.memory.clear_all()?;
        info!(memory = self.memory.name(), "memory tier reset");
        Ok(())
    }

    /// Return the cached value for `key`, or compute, store and return it.
    ///
    /// `ttl` of `None` falls back to the configured default. When `compute`
    /// fails nothing is written. Concurrent callers missing on the same key
    /// may each run `compute`.
    pub async fn fetch<F, Fut, E>(
        &self,
        key: &CacheKey,
        ttl: Option<Duration>,
        compute: F,
    ) -> Result<Bytes, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Bytes, E>>,
        E: From<CacheError>,
    {
        if let Some(value) = self.get(key).await? {
            return Ok(value);
        }

        let value = compute().await?;
        self.write(key, value.clone(), ttl.or(self.config.default_ttl))
            .await?;
        Ok(value)
    }

    pub async fn get_json<T>(&self, key: &CacheKey) -> Result<Option<T>, CacheError>
    where
        T: DeserializeOwned,
    {
        match self.get(key).await? {
            Some(raw) => decode(key, &raw).map(Some),
            None => Ok(None),
        }
    }

    pub async fn set_json<T>(&self, key: &CacheKey, value: &T) -> Result<(), CacheError>
    where
        T: Serialize + ?Sized,
    {
        let raw = encode(key, value)?;
        self.write(key, raw, self.config.default_ttl).await
    }

    /// Typed variant of [`fetch`](Self::fetch).
    pub async fn fetch_json<T, F, Fut, E>(
        &self,
        key: &CacheKey,
        ttl: Option<Duration>,
        compute: F,
    ) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: From<CacheError>,
    {
        if let Some(value) = self.get_json(key).await? {
            return Ok(value);
        }

        let value = compute().await?;
        let raw = encode(key, &value)?;
        self.write(key, raw, ttl.or(self.config.default_ttl))
            .await?;
        Ok(value)
    }

    async fn write(
        &self,
        key: &CacheKey,
        value: Bytes,
        ttl: Option<Duration>,
    ) -> Result<(), CacheError> {
        self.call_backing("set", Some(key), self.persistent.set(key, value.clone(), ttl))
            .await?;
        self.memory.set(key.clone(), value, ttl)?;
        debug!(key = %key, ttl = ?ttl, "cache entry written");
        Ok(())
    }

    async fn call_backing<T>(
        &self,
        op: &'static str,
        key: Option<&CacheKey>,
        call: impl Future<Output = Result<T, BackingStoreError>>,
    ) -> Result<T, CacheError> {
        let started = Instant::now();
        let result = call.await;
        histogram!(METRIC_BACKING_MS, "op" => op)
            .record(started.elapsed().as_secs_f64() * 1000.0);

        result.map_err(|err| {
            self.stats.backing_error(self.persistent.name(), op);
            warn!(
                op,
                key = key.map(CacheKey::as_str),
                store = err.store,
                kind = %err.kind,
                error = %err,
                "persistent tier operation failed"
            );
            CacheError::Backing(err)
        })
    }
}

impl fmt::Debug for MemoryFirstCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryFirstCache")
            .field("memory", &self.memory.name())
            .field("persistent", &self.persistent.name())
            .field("config", &self.config)
            .finish()
    }
}

fn shorter_ttl(remaining: Option<Duration>, default: Option<Duration>) -> Option<Duration> {
    match (remaining, default) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (a, b) => a.or(b),
    }
}

fn encode<T>(key: &CacheKey, value: &T) -> Result<Bytes, CacheError>
where
    T: Serialize + ?Sized,
{
    serde_json::to_vec(value)
        .map(Bytes::from)
        .map_err(|err| CacheError::codec(key.as_str(), err))
}

fn decode<T>(key: &CacheKey, raw: &[u8]) -> Result<T, CacheError>
where
    T: DeserializeOwned,
{
    serde_json::from_slice(raw).map_err(|err| CacheError::codec(key.as_str(), err))
}
