//! A memory-first, two-tier read-through cache.
//!
//! See [`cache::MemoryFirstCache`] for the facade callers use.

pub mod cache;
pub mod config;
pub mod infra;
