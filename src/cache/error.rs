//! Error taxonomy for the two-tier cache.
//!
//! A miss is never an error: `get` reports it as `Ok(None)`.

use std::fmt;

use thiserror::Error;

/// Failure category reported by a persistent tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackingStoreErrorKind {
    Connection,
    Timeout,
    Serialization,
    Other,
}

impl fmt::Display for BackingStoreErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Connection => "connection",
            Self::Timeout => "timeout",
            Self::Serialization => "serialization",
            Self::Other => "other",
        };
        f.write_str(label)
    }
}

/// Infrastructure failure surfaced by a persistent tier.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("backing store `{store}` failed ({kind}): {message}")]
pub struct BackingStoreError {
    pub store: &'static str,
    pub kind: BackingStoreErrorKind,
    pub message: String,
}

impl BackingStoreError {
    pub fn new(
        store: &'static str,
        kind: BackingStoreErrorKind,
        message: impl Into<String>,
    ) -> Self {
        Self {
            store,
            kind,
            message: message.into(),
        }
    }

    pub fn connection(store: &'static str, message: impl Into<String>) -> Self {
        Self::new(store, BackingStoreErrorKind::Connection, message)
    }

    pub fn timeout(store: &'static str, message: impl Into<String>) -> Self {
        Self::new(store, BackingStoreErrorKind::Timeout, message)
    }

    pub fn serialization(store: &'static str, message: impl Into<String>) -> Self {
        Self::new(store, BackingStoreErrorKind::Serialization, message)
    }

    pub fn other(store: &'static str, message: impl Into<String>) -> Self {
        Self::new(store, BackingStoreErrorKind::Other, message)
    }
}

/// Failure of the process-local memory tier.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("memory store `{store}` failed during `{op}`: {message}")]
pub struct MemoryStoreError {
    pub store: &'static str,
    pub op: &'static str,
    pub message: String,
}

impl MemoryStoreError {
    pub fn new(store: &'static str, op: &'static str, message: impl Into<String>) -> Self {
        Self {
            store,
            op,
            message: message.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache keys must not be empty")]
    InvalidKey,
    #[error(transparent)]
    Backing(#[from] BackingStoreError),
    #[error(transparent)]
    Internal(#[from] MemoryStoreError),
    #[error("failed to encode or decode cached value for `{key}`: {source}")]
    Codec {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

impl CacheError {
    pub fn codec(key: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Codec {
            key: key.into(),
            source,
        }
    }

    /// The backing-store failure carried by this error, if any.
    pub fn backing(&self) -> Option<&BackingStoreError> {
        match self {
            Self::Backing(err) => Some(err),
            _ => None,
        }
    }
}
