//! memfirst cache system
//!
//! A two-tier, read-through cache:
//!
//! - **Memory tier**: process-local and fastest, never authoritative
//! - **Persistent tier**: shared across processes, the source of truth
//!
//! [`MemoryFirstCache`] is the only entry point callers use. Reads check the
//! memory tier, fall through to the persistent tier and copy hits back into
//! memory. Writes land in the persistent tier first and reach memory only
//! after the persistent tier accepted them.
//!
//! ## Configuration
//!
//! The memory tier is shaped by the `[cache]` section of `memfirst.toml`:
//!
//! ```toml
//! [cache]
//! memory_capacity = 10000
//! memory_shards = 16
//! default_ttl_seconds = 3600
//! ```

mod config;
mod error;
mod facade;
mod keys;
mod lock;
mod memory;
mod persistent;
mod stats;

pub use config::CacheConfig;
pub use error::{BackingStoreError, BackingStoreErrorKind, CacheError, MemoryStoreError};
pub use facade::MemoryFirstCache;
pub use keys::CacheKey;
pub use memory::{MemoryStore, ShardedLruStore};
pub use persistent::{LocalBackingStore, PersistentStore, StoredValue};
pub use stats::CacheStats;
