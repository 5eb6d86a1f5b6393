//! Cache key type.

use std::{borrow::Borrow, fmt};

use super::error::CacheError;

/// Opaque, non-empty key identifying a cached value.
///
/// The cache attaches no structure to keys; `"user:42"` and `"user/42"` are
/// simply different byte sequences. Uniqueness is the caller's concern.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    /// Build a key, rejecting the empty string.
    pub fn new(raw: impl Into<String>) -> Result<Self, CacheError> {
        let raw = raw.into();
        if raw.is_empty() {
            return Err(CacheError::InvalidKey);
        }
        Ok(Self(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for CacheKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for CacheKey {
    type Error = CacheError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<&str> for CacheKey {
    type Error = CacheError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}
