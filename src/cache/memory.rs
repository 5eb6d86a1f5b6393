//! Memory tier: process-local key-value storage.
//!
//! The facade only relies on the [`MemoryStore`] capability set. The bundled
//! [`ShardedLruStore`] spreads keys across independently locked LRU shards so
//! that operations on unrelated keys rarely wait on each other.

use std::{
    collections::hash_map::RandomState,
    hash::BuildHasher,
    sync::RwLock,
    time::{Duration, Instant},
};

use bytes::Bytes;
use lru::LruCache;
use metrics::counter;

use super::config::CacheConfig;
use super::error::MemoryStoreError;
use super::keys::CacheKey;
use super::lock::{rw_read, rw_write};

const SOURCE: &str = "cache::memory";
const METRIC_MEMORY_EVICT_TOTAL: &str = "memfirst_cache_memory_evict_total";

/// Capability set the facade needs from a memory tier.
///
/// Implementations must tolerate concurrent callers. Same-key races resolve
/// last-write-wins and a `get` never observes a partially written value.
pub trait MemoryStore: Send + Sync {
    /// A short name for logs and errors.
    fn name(&self) -> &'static str;

    fn get(&self, key: &CacheKey) -> Result<Option<Bytes>, MemoryStoreError>;

    /// Store `value`, replacing any previous entry. `ttl` bounds how long the
    /// entry may be served.
    fn set(
        &self,
        key: CacheKey,
        value: Bytes,
        ttl: Option<Duration>,
    ) -> Result<(), MemoryStoreError>;

    /// Remove `key`. Absent keys are not an error.
    fn delete(&self, key: &CacheKey) -> Result<(), MemoryStoreError>;

    fn clear_all(&self) -> Result<(), MemoryStoreError>;

    /// Check for a live entry without affecting recency.
    fn contains(&self, key: &CacheKey) -> bool;

    /// Number of stored entries, including any that expired but were not yet
    /// dropped.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Clone)]
struct MemoryEntry {
    value: Bytes,
    expires_at: Option<Instant>,
}

impl MemoryEntry {
    fn new(value: Bytes, ttl: Option<Duration>) -> Self {
        let expires_at = ttl.and_then(|ttl| Instant::now().checked_add(ttl));
        Self { value, expires_at }
    }

    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.is_none_or(|deadline| now < deadline)
    }
}

/// Sharded, optionally bounded LRU memory tier.
pub struct ShardedLruStore {
    shards: Vec<RwLock<LruCache<CacheKey, MemoryEntry>>>,
    hasher: RandomState,
}

impl ShardedLruStore {
    /// Create a store shaped by the given configuration.
    pub fn new(config: &CacheConfig) -> Self {
        let shard_count = config.memory_shards_non_zero().get();
        let capacity = config.shard_capacity();
        let shards = (0..shard_count)
            .map(|_| {
                let cache = match capacity {
                    Some(capacity) => LruCache::new(capacity),
                    None => LruCache::unbounded(),
                };
                RwLock::new(cache)
            })
            .collect();

        Self {
            shards,
            hasher: RandomState::new(),
        }
    }

    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    fn shard(&self, key: &CacheKey) -> &RwLock<LruCache<CacheKey, MemoryEntry>> {
        let index = (self.hasher.hash_one(key) % self.shards.len() as u64) as usize;
        &self.shards[index]
    }
}

impl Default for ShardedLruStore {
    fn default() -> Self {
        Self::new(&CacheConfig::default())
    }
}

impl MemoryStore for ShardedLruStore {
    fn name(&self) -> &'static str {
        "sharded_lru"
    }

    fn get(&self, key: &CacheKey) -> Result<Option<Bytes>, MemoryStoreError> {
        let mut shard = rw_write(self.shard(key), SOURCE, "get");
        match shard.get(key) {
            Some(entry) if entry.is_live(Instant::now()) => return Ok(Some(entry.value.clone())),
            Some(_) => {}
            None => return Ok(None),
        }
        // Expired: drop it so it stops counting against capacity.
        shard.pop(key);
        Ok(None)
    }

    fn set(
        &self,
        key: CacheKey,
        value: Bytes,
        ttl: Option<Duration>,
    ) -> Result<(), MemoryStoreError> {
        let mut shard = rw_write(self.shard(&key), SOURCE, "set");
        let inserted = key.clone();
        let displaced = shard.push(key, MemoryEntry::new(value, ttl));
        // `push` also hands back the old entry on overwrite; only a different key is an eviction.
        if displaced.is_some_and(|(displaced_key, _)| displaced_key != inserted) {
            counter!(METRIC_MEMORY_EVICT_TOTAL).increment(1);
        }
        Ok(())
    }

    fn delete(&self, key: &CacheKey) -> Result<(), MemoryStoreError> {
        rw_write(self.shard(key), SOURCE, "delete").pop(key);
        Ok(())
    }

    fn clear_all(&self) -> Result<(), MemoryStoreError> {
        for shard in &self.shards {
            rw_write(shard, SOURCE, "clear_all").clear();
        }
        Ok(())
    }

    fn contains(&self, key: &CacheKey) -> bool {
        rw_read(self.shard(key), SOURCE, "contains")
            .peek(key)
            .is_some_and(|entry| entry.is_live(Instant::now()))
    }

    fn len(&self) -> usize {
        self.shards
            .iter()
            .map(|shard| rw_read(shard, SOURCE, "len").len())
            .sum()
    }
}
