//! Cache configuration.
//!
//! Controls the memory tier's shape and the default entry lifetime. Built
//! from the validated `[cache]` settings.

use std::{num::NonZeroUsize, time::Duration};

const DEFAULT_MEMORY_SHARDS: usize = 16;

#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Maximum entries held by the memory tier; `0` means unbounded.
    pub memory_capacity: usize,
    /// Number of independently locked memory tier shards.
    pub memory_shards: usize,
    /// Lifetime applied by `set` when the caller gives none.
    pub default_ttl: Option<Duration>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            memory_capacity: 0,
            memory_shards: DEFAULT_MEMORY_SHARDS,
            default_ttl: None,
        }
    }
}

impl From<&crate::config::CacheSettings> for CacheConfig {
    fn from(settings: &crate::config::CacheSettings) -> Self {
        Self {
            memory_capacity: settings.memory_capacity.map_or(0, NonZeroUsize::get),
            memory_shards: settings.memory_shards.get(),
            default_ttl: settings.default_ttl,
        }
    }
}

impl CacheConfig {
    /// Returns true when the memory tier evicts on capacity.
    pub fn is_bounded(&self) -> bool {
        self.memory_capacity > 0
    }

    /// Returns the shard count as NonZeroUsize, clamping to 1 if zero.
    pub fn memory_shards_non_zero(&self) -> NonZeroUsize {
        NonZeroUsize::new(self.memory_shards).unwrap_or(NonZeroUsize::MIN)
    }

    /// Per-shard capacity, or `None` when unbounded.
    ///
    /// Capacity is split evenly and rounded up, so every shard holds at least
    /// one entry and the total never falls below `memory_capacity`.
    pub fn shard_capacity(&self) -> Option<NonZeroUsize> {
        if !self.is_bounded() {
            return None;
        }
        let shards = self.memory_shards_non_zero().get();
        NonZeroUsize::new(self.memory_capacity.div_ceil(shards))
    }
}
