//! Hit/miss accounting for the facade.
//!
//! Every recorded event is mirrored to the `metrics` facade so that an
//! installed recorder sees the same numbers as [`CacheStats`].

use std::sync::atomic::{AtomicU64, Ordering};

use metrics::counter;

const METRIC_MEMORY_HIT_TOTAL: &str = "memfirst_cache_memory_hit_total";
const METRIC_MEMORY_MISS_TOTAL: &str = "memfirst_cache_memory_miss_total";
const METRIC_BACKING_HIT_TOTAL: &str = "memfirst_cache_backing_hit_total";
const METRIC_BACKING_MISS_TOTAL: &str = "memfirst_cache_backing_miss_total";
const METRIC_BACKING_ERROR_TOTAL: &str = "memfirst_cache_backing_error_total";

/// Point-in-time counters for one facade.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Reads answered by the memory tier.
    pub memory_hits: u64,
    /// Reads that fell through to the persistent tier.
    pub memory_misses: u64,
    /// Fall-through reads the persistent tier answered.
    pub backing_hits: u64,
    /// Fall-through reads the persistent tier did not have either.
    pub backing_misses: u64,
    /// Persistent-tier operations that failed.
    pub backing_errors: u64,
}

impl CacheStats {
    /// Memory tier hit rate (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        let total = self.memory_hits + self.memory_misses;
        if total == 0 {
            0.0
        } else {
            self.memory_hits as f64 / total as f64
        }
    }
}

#[derive(Debug, Default)]
pub(crate) struct StatsRecorder {
    memory_hits: AtomicU64,
    memory_misses: AtomicU64,
    backing_hits: AtomicU64,
    backing_misses: AtomicU64,
    backing_errors: AtomicU64,
}

impl StatsRecorder {
    pub(crate) fn memory_hit(&self) {
        self.memory_hits.fetch_add(1, Ordering::Relaxed);
        counter!(METRIC_MEMORY_HIT_TOTAL).increment(1);
    }

    pub(crate) fn memory_miss(&self) {
        self.memory_misses.fetch_add(1, Ordering::Relaxed);
        counter!(METRIC_MEMORY_MISS_TOTAL).increment(1);
    }

    pub(crate) fn backing_hit(&self) {
        self.backing_hits.fetch_add(1, Ordering::Relaxed);
        counter!(METRIC_BACKING_HIT_TOTAL).increment(1);
    }

    pub(crate) fn backing_miss(&self) {
        self.backing_misses.fetch_add(1, Ordering::Relaxed);
        counter!(METRIC_BACKING_MISS_TOTAL).increment(1);
    }

    pub(crate) fn backing_error(&self, store: &'static str, op: &'static str) {
        self.backing_errors.fetch_add(1, Ordering::Relaxed);
        counter!(METRIC_BACKING_ERROR_TOTAL, "store" => store, "op" => op).increment(1);
    }

    pub(crate) fn snapshot(&self) -> CacheStats {
        CacheStats {
            memory_hits: self.memory_hits.load(Ordering::Relaxed),
            memory_misses: self.memory_misses.load(Ordering::Relaxed),
            backing_hits: self.backing_hits.load(Ordering::Relaxed),
            backing_misses: self.backing_misses.load(Ordering::Relaxed),
            backing_errors: self.backing_errors.load(Ordering::Relaxed),
        }
    }
}
