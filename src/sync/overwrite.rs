// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! One-way overwrite of cache entries from their source.
//!
//! No diffing: whatever the cache holds for a key is replaced by the source's
//! current value, tagged with a fresh expiration. A key the source does not
//! have is removed from the cache.

use std::marker::PhantomData;
use std::time::Duration;

use async_trait::async_trait;
use futures::TryStreamExt;

use crate::cancel::CancellationToken;
use crate::storage::entry::CacheEntry;
use crate::storage::traits::{KeysMap, Map};

use super::{SyncReport, SyncSession, Synchronizer};

const SYNCHRONIZER: &str = "overwrite_map";

pub struct OverwriteMapSynchronizer<K, V> {
    expiration: Option<Duration>,
    _marker: PhantomData<fn() -> (K, V)>,
}

impl<K, V> OverwriteMapSynchronizer<K, V> {
    /// `expiration` is the TTL stamped on every entry written; `None` never expires.
    #[must_use]
    pub fn new(expiration: Option<Duration>) -> Self {
        Self {
            expiration,
            _marker: PhantomData,
        }
    }

    #[must_use]
    pub fn expiration(&self) -> Option<Duration> {
        self.expiration
    }
}

impl<K, V> OverwriteMapSynchronizer<K, V>
where
    K: Send + Sync,
    V: Send + Sync,
{
    /// Mirror the source's current value for `key` into the cache.
    pub async fn synchronize_key<S, C>(
        &self,
        source: &S,
        cache: &C,
        key: &K,
        budget: Duration,
    ) -> SyncReport
    where
        S: Map<K, V> + ?Sized,
        C: Map<K, CacheEntry<V>> + ?Sized,
    {
        let mut session = SyncSession::start(SYNCHRONIZER, budget);
        let cancel = CancellationToken::none();

        let value = match session.step(source.get_or_default(key, &cancel)).await {
            Some(Ok(value)) => value,
            Some(Err(e)) => {
                session.record_failure(&e);
                return session.finish();
            }
            None => return session.time_out(),
        };
        if !self.overwrite_in(&mut session, cache, key, value, &cancel).await {
            return session.time_out();
        }
        session.finish()
    }

    /// Write a value already read from the source into the cache
    /// (`None` removes the cached entry).
    pub async fn overwrite<C>(
        &self,
        cache: &C,
        key: &K,
        value: Option<V>,
        budget: Duration,
    ) -> SyncReport
    where
        C: Map<K, CacheEntry<V>> + ?Sized,
    {
        let mut session = SyncSession::start(SYNCHRONIZER, budget);
        let cancel = CancellationToken::none();

        if !self.overwrite_in(&mut session, cache, key, value, &cancel).await {
            return session.time_out();
        }
        session.finish()
    }

    /// Returns `false` once the session deadline has passed.
    async fn overwrite_in<C>(
        &self,
        session: &mut SyncSession,
        cache: &C,
        key: &K,
        value: Option<V>,
        cancel: &CancellationToken,
    ) -> bool
    where
        C: Map<K, CacheEntry<V>> + ?Sized,
    {
        let written = match value {
            Some(value) => {
                let entry = CacheEntry::new(value, self.expiration);
                session.step(cache.try_add(key, &entry, true, cancel)).await
            }
            None => session.step(cache.try_remove(key, cancel)).await,
        };

        match written {
            Some(Ok(_)) => {
                session.record_copied();
                true
            }
            Some(Err(e)) => {
                session.record_failure(&e);
                true
            }
            None => false,
        }
    }
}

/// Full sweep: every source key is overwritten into the cache.
#[async_trait]
impl<K, V, S, C> Synchronizer<S, C> for OverwriteMapSynchronizer<K, V>
where
    K: Send + Sync,
    V: Send + Sync,
    S: KeysMap<K, V> + ?Sized,
    C: Map<K, CacheEntry<V>> + ?Sized,
{
    async fn synchronize(&self, source: &S, cache: &C, budget: Duration) -> SyncReport {
        let mut session = SyncSession::start(SYNCHRONIZER, budget);
        let cancel = CancellationToken::none();

        let keys: Vec<K> = match session.step(source.keys(&cancel).try_collect()).await {
            Some(Ok(keys)) => keys,
            Some(Err(e)) => {
                session.record_failure(&e);
                return session.finish();
            }
            None => return session.time_out(),
        };

        for key in &keys {
            let value = match session.step(source.get_or_default(key, &cancel)).await {
                Some(Ok(value)) => value,
                Some(Err(e)) => {
                    session.record_failure(&e);
                    continue;
                }
                None => return session.time_out(),
            };
            if !self.overwrite_in(&mut session, cache, key, value, &cancel).await {
                return session.time_out();
            }
        }

        session.finish()
    }
}
