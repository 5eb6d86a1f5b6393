//! Persistent tier: the shared, authoritative key-value store.
//!
//! The facade talks to the persistent tier only through [`PersistentStore`].
//! Transport, serialization and expiry are the implementation's business.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;

use super::error::BackingStoreError;
use super::keys::CacheKey;

/// A value read from the persistent tier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredValue {
    pub value: Bytes,
    /// Time left before the entry expires; `None` when it never does.
    pub ttl: Option<Duration>,
}

impl StoredValue {
    pub fn new(value: Bytes, ttl: Option<Duration>) -> Self {
        Self { value, ttl }
    }

    pub fn into_value(self) -> Bytes {
        self.value
    }
}

#[async_trait]
pub trait PersistentStore: Send + Sync {
    /// A name for logs, metrics and error reports, e.g. `"postgres"`.
    fn name(&self) -> &'static str;

    /// Return the stored value with its remaining lifetime, or `None` for a
    /// miss (including expired entries).
    async fn get(&self, key: &CacheKey) -> Result<Option<StoredValue>, BackingStoreError>;

    /// Store `value`, replacing any previous one. `ttl` of `None` means the
    /// entry never expires.
    async fn set(
        &self,
        key: &CacheKey,
        value: Bytes,
        ttl: Option<Duration>,
    ) -> Result<(), BackingStoreError>;

    /// Remove `key`; succeeds when the key is absent.
    async fn delete(&self, key: &CacheKey) -> Result<(), BackingStoreError>;

    /// Remove every entry.
    async fn clear_all(&self) -> Result<(), BackingStoreError>;
}

#[derive(Clone)]
struct StoredEntry {
    value: Bytes,
    expires_at: Option<Instant>,
}

/// In-process persistent tier backed by a concurrent map.
///
/// Shared by every facade handed the same `Arc`, which makes it the backing
/// store of choice for single-process deployments and tests.
#[derive(Default)]
pub struct LocalBackingStore {
    entries: DashMap<CacheKey, StoredEntry>,
}

impl LocalBackingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries, including expired ones not yet dropped.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl PersistentStore for LocalBackingStore {
    fn name(&self) -> &'static str {
        "local"
    }

    async fn get(&self, key: &CacheKey) -> Result<Option<StoredValue>, BackingStoreError> {
        let now = Instant::now();
        let live = self.entries.get(key).map(|entry| {
            let live = entry.expires_at.is_none_or(|deadline| now < deadline);
            let remaining = entry
                .expires_at
                .map(|deadline| deadline.saturating_duration_since(now));
            (live, StoredValue::new(entry.value.clone(), remaining))
        });

        match live {
            Some((true, stored)) => Ok(Some(stored)),
            Some((false, _)) => {
                self.entries
                    .remove_if(key, |_, entry| entry.expires_at.is_some_and(|d| d <= now));
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn set(
        &self,
        key: &CacheKey,
        value: Bytes,
        ttl: Option<Duration>,
    ) -> Result<(), BackingStoreError> {
        let expires_at = ttl.and_then(|ttl| Instant::now().checked_add(ttl));
        self.entries
            .insert(key.clone(), StoredEntry { value, expires_at });
        Ok(())
    }

    async fn delete(&self, key: &CacheKey) -> Result<(), BackingStoreError> {
        self.entries.remove(key);
        Ok(())
    }

    async fn clear_all(&self) -> Result<(), BackingStoreError> {
        self.entries.clear();
        Ok(())
    }
}
