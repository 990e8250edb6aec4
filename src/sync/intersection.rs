// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Two-way reconciliation of the entries each side is missing.
//!
//! Both key sets are collected, then the symmetric difference is walked in
//! ascending key order: a key found only in `a` is copied into `b`, a key
//! found only in `b` is copied into `a`. Keys present on both sides are never
//! compared, so conflicting values survive a session untouched.

use std::collections::BTreeSet;
use std::marker::PhantomData;
use std::time::Duration;

use async_trait::async_trait;
use futures::TryStreamExt;

use crate::cancel::CancellationToken;
use crate::storage::traits::{KeysMap, Set, StoreResult};

use super::{SyncReport, SyncSession, Synchronizer};

const MAP_SYNCHRONIZER: &str = "intersection_map";
const SET_SYNCHRONIZER: &str = "intersection_set";

/// Intersection synchronizer for [`KeysMap`] pairs.
pub struct IntersectionMapSynchronizer<K, V> {
    _marker: PhantomData<fn() -> (K, V)>,
}

impl<K, V> IntersectionMapSynchronizer<K, V> {
    #[must_use]
    pub fn new() -> Self {
        Self { _marker: PhantomData }
    }
}

impl<K, V> Default for IntersectionMapSynchronizer<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<K, V, S> Synchronizer<S> for IntersectionMapSynchronizer<K, V>
where
    K: Ord + Send + Sync,
    V: Send + Sync,
    S: KeysMap<K, V> + ?Sized,
{
    async fn synchronize(&self, a: &S, b: &S, budget: Duration) -> SyncReport {
        let mut session = SyncSession::start(MAP_SYNCHRONIZER, budget);
        let cancel = CancellationToken::none();

        let a_keys = match session.step(collect_keys::<K, V, S>(a, &cancel)).await {
            Some(Ok(keys)) => keys,
            Some(Err(e)) => {
                session.record_failure(&e);
                return session.finish();
            }
            None => return session.time_out(),
        };
        let b_keys = match session.step(collect_keys::<K, V, S>(b, &cancel)).await {
            Some(Ok(keys)) => keys,
            Some(Err(e)) => {
                session.record_failure(&e);
                return session.finish();
            }
            None => return session.time_out(),
        };

        for key in a_keys.symmetric_difference(&b_keys) {
            let (from, to) = if a_keys.contains(key) { (a, b) } else { (b, a) };
            if !copy_entry::<K, V, S>(&mut session, from, to, key, &cancel).await {
                return session.time_out();
            }
        }

        session.finish()
    }
}

async fn collect_keys<K, V, S>(map: &S, cancel: &CancellationToken) -> StoreResult<BTreeSet<K>>
where
    K: Ord,
    S: KeysMap<K, V> + ?Sized,
{
    map.keys(cancel).try_collect().await
}

/// Copy `key` from `from` into `to` without overwriting. Returns `false` once
/// the session deadline has passed.
async fn copy_entry<K, V, S>(
    session: &mut SyncSession,
    from: &S,
    to: &S,
    key: &K,
    cancel: &CancellationToken,
) -> bool
where
    S: KeysMap<K, V> + ?Sized,
{
    let value = match session.step(from.get_or_default(key, cancel)).await {
        Some(Ok(Some(value))) => value,
        // Removed since the keys were listed.
        Some(Ok(None)) => return true,
        Some(Err(e)) => {
            session.record_failure(&e);
            return true;
        }
        None => return false,
    };

    match session.step(to.try_add(key, &value, false, cancel)).await {
        Some(Ok(true)) => {
            session.record_copied();
            true
        }
        Some(Ok(false)) => true,
        Some(Err(e)) => {
            session.record_failure(&e);
            true
        }
        None => false,
    }
}

/// Intersection synchronizer for [`Set`] pairs; items play the role of keys.
pub struct IntersectionSetSynchronizer<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> IntersectionSetSynchronizer<T> {
    #[must_use]
    pub fn new() -> Self {
        Self { _marker: PhantomData }
    }
}

impl<T> Default for IntersectionSetSynchronizer<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<T, S> Synchronizer<S> for IntersectionSetSynchronizer<T>
where
    T: Ord + Send + Sync,
    S: Set<T> + ?Sized,
{
    async fn synchronize(&self, a: &S, b: &S, budget: Duration) -> SyncReport {
        let mut session = SyncSession::start(SET_SYNCHRONIZER, budget);
        let cancel = CancellationToken::none();

        let a_items: BTreeSet<T> = match session.step(a.enumerate(&cancel).try_collect()).await {
            Some(Ok(items)) => items,
            Some(Err(e)) => {
                session.record_failure(&e);
                return session.finish();
            }
            None => return session.time_out(),
        };
        let b_items: BTreeSet<T> = match session.step(b.enumerate(&cancel).try_collect()).await {
            Some(Ok(items)) => items,
            Some(Err(e)) => {
                session.record_failure(&e);
                return session.finish();
            }
            None => return session.time_out(),
        };

        for item in a_items.symmetric_difference(&b_items) {
            let to = if a_items.contains(item) { b } else { a };
            match session.step(to.add(item, &cancel)).await {
                Some(Ok(())) => session.record_copied(),
                Some(Err(e)) => session.record_failure(&e),
                None => return session.time_out(),
            }
        }

        session.finish()
    }
}
