// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Cache pair: a fast store shadowing an authoritative source.
//!
//! The source decides every outcome. Writes run on the source only and are
//! then mirrored into the cache key by key; reads prefer a live cache entry
//! and otherwise read the source and populate the cache. The cache is a
//! front for latency, not a fallback: a failing source read fails the call.
//!
//! Cached values are stored as [`CacheEntry`] so expiration can be checked
//! here at read time, whatever the cache backend supports natively.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::cancel::CancellationToken;
use crate::metrics;
use crate::storage::entry::CacheEntry;
use crate::storage::traits::{KeysMap, Map, StoreFuture, StoreResult};
use crate::sync::{OverwriteMapSynchronizer, SyncReport, Synchronizer};

const STRATEGY: &str = "cache";

/// What a cache probe found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheLookup<V> {
    Hit(V),
    Miss,
    /// An entry was present but past its expiration; it has been dropped.
    Expired,
}

pub struct CacheStrategy<K, V, S: ?Sized, C: ?Sized> {
    source: Arc<S>,
    cache: Arc<C>,
    synchronizer: OverwriteMapSynchronizer<K, V>,
    sync_timeout: Duration,
}

impl<K, V, S: ?Sized, C: ?Sized> CacheStrategy<K, V, S, C> {
    /// `expiration` is the TTL of every cached entry; `None` never expires.
    pub fn new(
        source: Arc<S>,
        cache: Arc<C>,
        expiration: Option<Duration>,
        sync_timeout: Duration,
    ) -> Self {
        Self {
            source,
            cache,
            synchronizer: OverwriteMapSynchronizer::new(expiration),
            sync_timeout,
        }
    }

    pub fn source(&self) -> &Arc<S> {
        &self.source
    }

    pub fn cache(&self) -> &Arc<C> {
        &self.cache
    }

    #[must_use]
    pub fn expiration(&self) -> Option<Duration> {
        self.synchronizer.expiration()
    }
}

impl<K, V, S, C> CacheStrategy<K, V, S, C>
where
    K: Send + Sync,
    V: Clone + Send + Sync,
    S: Map<K, V> + ?Sized,
    C: Map<K, CacheEntry<V>> + ?Sized,
{
    /// Run a write on the source, then mirror `key` into the cache.
    ///
    /// Only the source decides the result. A mirror that does not complete is
    /// logged and the cached entry for `key` is dropped, so the next read goes
    /// to the source.
    pub async fn execute_write<'a, T, F>(
        &'a self,
        operation: &'static str,
        key: &K,
        cancel: &CancellationToken,
        op: F,
    ) -> StoreResult<T>
    where
        F: FnOnce(&'a S) -> StoreFuture<'a, T>,
    {
        let fut = op(self.source.as_ref());
        let result = match cancel.guard(fut).await {
            Ok(result) => result,
            Err(e) => {
                debug!(operation, error = %e, "Cache pair write failed on source");
                metrics::record_write_failure(STRATEGY, "source");
                return Err(e);
            }
        };

        let mirror = async {
            Ok(self
                .synchronizer
                .synchronize_key(self.source.as_ref(), self.cache.as_ref(), key, self.sync_timeout)
                .await)
        };
        let report = cancel.guard(mirror).await?;
        self.settle_mirror(operation, key, &report, cancel).await?;

        Ok(result)
    }

    /// Probe the cache. Cache failures count as a miss.
    pub async fn lookup(&self, key: &K, cancel: &CancellationToken) -> StoreResult<CacheLookup<V>> {
        let fut = self.cache.get_or_default(key, cancel);
        match cancel.guard(fut).await {
            Ok(Some(entry)) if !entry.is_expired() => {
                metrics::record_cache_lookup("hit");
                Ok(CacheLookup::Hit(entry.into_value()))
            }
            Ok(Some(_)) => {
                metrics::record_cache_lookup("expired");
                let fut = self.cache.try_remove(key, cancel);
                match cancel.guard(fut).await {
                    Err(e) if e.is_cancelled() => return Err(e),
                    Err(e) => debug!(error = %e, "Failed to drop expired cache entry"),
                    Ok(_) => {}
                }
                Ok(CacheLookup::Expired)
            }
            Ok(None) => {
                metrics::record_cache_lookup("miss");
                Ok(CacheLookup::Miss)
            }
            Err(e) if e.is_cancelled() => Err(e),
            Err(e) => {
                warn!(error = %e, "Cache read failed, reading source");
                metrics::record_cache_lookup("error");
                Ok(CacheLookup::Miss)
            }
        }
    }

    /// Read through the cache: a live entry wins, otherwise the source answers
    /// and its value is cached with a fresh expiration.
    pub async fn get(&self, key: &K, cancel: &CancellationToken) -> StoreResult<Option<V>> {
        if let CacheLookup::Hit(value) = self.lookup(key, cancel).await? {
            return Ok(Some(value));
        }

        let fut = self.source.get_or_default(key, cancel);
        let value = cancel.guard(fut).await?;

        if let Some(found) = &value {
            let populate = async {
                Ok(self
                    .synchronizer
                    .overwrite(self.cache.as_ref(), key, Some(found.clone()), self.sync_timeout)
                    .await)
            };
            let report = cancel.guard(populate).await?;
            self.settle_mirror("get_or_default", key, &report, cancel).await?;
        }

        Ok(value)
    }

    pub async fn contains_key(&self, key: &K, cancel: &CancellationToken) -> StoreResult<bool> {
        if let CacheLookup::Hit(_) = self.lookup(key, cancel).await? {
            return Ok(true);
        }
        let fut = self.source.contains_key(key, cancel);
        cancel.guard(fut).await
    }

    /// Drop the cached entry for `key`; the source is untouched.
    pub async fn invalidate(&self, key: &K, cancel: &CancellationToken) -> StoreResult<bool> {
        let fut = self.cache.try_remove(key, cancel);
        cancel.guard(fut).await
    }

    /// After an incomplete mirror, drop `key` from the cache within the sync
    /// timeout. Only cancellation escapes.
    async fn settle_mirror(
        &self,
        operation: &'static str,
        key: &K,
        report: &SyncReport,
        cancel: &CancellationToken,
    ) -> StoreResult<()> {
        if report.is_complete() {
            return Ok(());
        }
        warn!(operation, outcome = %report.outcome, "Cache mirror incomplete, dropping entry");
        metrics::record_write_failure(STRATEGY, "cache");

        let fut = cancel.guard(self.cache.try_remove(key, cancel));
        match tokio::time::timeout(self.sync_timeout, fut).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(e)) if e.is_cancelled() => Err(e),
            Ok(Err(e)) => {
                warn!(operation, error = %e, "Failed to drop cache entry, it may be stale");
                Ok(())
            }
            Err(_) => {
                warn!(operation, "Timed out dropping cache entry, it may be stale");
                Ok(())
            }
        }
    }
}

impl<K, V, S, C> CacheStrategy<K, V, S, C>
where
    K: Send + Sync,
    V: Send + Sync,
    S: KeysMap<K, V> + ?Sized,
    C: Map<K, CacheEntry<V>> + ?Sized,
{
    /// Re-populate the cache from every source key, bounded by the sync timeout.
    pub async fn synchronize(&self) -> SyncReport {
        self.synchronizer
            .synchronize(self.source.as_ref(), self.cache.as_ref(), self.sync_timeout)
            .await
    }
}
