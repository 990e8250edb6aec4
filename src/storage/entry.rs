// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Expiration-tagged values held by the cache side of a cache pair.

use std::time::{Duration, SystemTime};

use serde::{Deserialize, Serialize};

/// A cached value plus the instant after which it must be treated as absent.
///
/// Expiration is evaluated by the reader, so the cache store needs no native
/// TTL support.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use tandem_store::CacheEntry;
///
/// let entry = CacheEntry::new("v1", Some(Duration::from_secs(60)));
/// assert!(!entry.is_expired());
///
/// let forever = CacheEntry::new("v1", None);
/// assert!(forever.expires_at.is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry<V> {
    pub value: V,
    /// `None` never expires.
    pub expires_at: Option<SystemTime>,
}

impl<V> CacheEntry<V> {
    /// Tag `value` with an expiration of now + `ttl`.
    pub fn new(value: V, ttl: Option<Duration>) -> Self {
        Self {
            value,
            expires_at: ttl.map(|ttl| SystemTime::now() + ttl),
        }
    }

    #[must_use]
    pub fn is_expired_at(&self, now: SystemTime) -> bool {
        self.expires_at.is_some_and(|at| now >= at)
    }

    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(SystemTime::now())
    }

    pub fn into_value(self) -> V {
        self.value
    }
}
