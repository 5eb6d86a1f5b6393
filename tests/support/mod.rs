//! Test doubles shared by the integration tests.

use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use bytes::Bytes;
use memfirst::cache::{
    BackingStoreError, CacheConfig, CacheKey, LocalBackingStore, MemoryFirstCache,
    PersistentStore, StoredValue,
};

/// Persistent tier that counts calls and can be taken offline.
#[allow(dead_code)]
#[derive(Default)]
pub struct RecordingBackingStore {
    inner: LocalBackingStore,
    offline: AtomicBool,
    gets: AtomicUsize,
    sets: AtomicUsize,
    deletes: AtomicUsize,
    clears: AtomicUsize,
}

#[allow(dead_code)]
impl RecordingBackingStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn go_offline(&self) {
        self.offline.store(true, Ordering::SeqCst);
    }

    pub fn go_online(&self) {
        self.offline.store(false, Ordering::SeqCst);
    }

    pub fn gets(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }

    pub fn sets(&self) -> usize {
        self.sets.load(Ordering::SeqCst)
    }

    pub fn deletes(&self) -> usize {
        self.deletes.load(Ordering::SeqCst)
    }

    pub fn clears(&self) -> usize {
        self.clears.load(Ordering::SeqCst)
    }

    /// Read straight from the underlying map, bypassing counters and the offline switch.
    pub async fn peek(&self, key: &CacheKey) -> Option<Bytes> {
        self.inner
            .get(key)
            .await
            .expect("local store never fails")
            .map(StoredValue::into_value)
    }

    /// Write straight to the underlying map, as another process would.
    pub async fn seed(&self, key: &CacheKey, value: &'static str) {
        self.inner
            .set(key, Bytes::from_static(value.as_bytes()), None)
            .await
            .expect("local store never fails");
    }

    fn check(&self) -> Result<(), BackingStoreError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(BackingStoreError::connection(
                "recording",
                "backing store unreachable",
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl PersistentStore for RecordingBackingStore {
    fn name(&self) -> &'static str {
        "recording"
    }

    async fn get(&self, key: &CacheKey) -> Result<Option<StoredValue>, BackingStoreError> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        self.inner.get(key).await
    }

    async fn set(
        &self,
        key: &CacheKey,
        value: Bytes,
        ttl: Option<Duration>,
    ) -> Result<(), BackingStoreError> {
        self.sets.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        self.inner.set(key, value, ttl).await
    }

    async fn delete(&self, key: &CacheKey) -> Result<(), BackingStoreError> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        self.inner.delete(key).await
    }

    async fn clear_all(&self) -> Result<(), BackingStoreError> {
        self.clears.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        self.inner.clear_all().await
    }
}

#[allow(dead_code)]
pub fn cache_with(backing: &Arc<RecordingBackingStore>) -> MemoryFirstCache {
    MemoryFirstCache::with_backing(backing.clone(), CacheConfig::default())
}

pub fn key(raw: &str) -> CacheKey {
    CacheKey::new(raw).expect("valid key")
}
