// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Fault-injecting store wrapper shared by the unit tests.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use futures::{stream, StreamExt, TryStreamExt};
use serde_json::Value;

use crate::cancel::CancellationToken;
use crate::storage::traits::{
    BlockingQueue, KeysMap, Map, PropertyMap, Queue, Set, SnapshotQueue, StorageError,
    StoreResult, StoreStream,
};

/// Wraps any store. Every call first sleeps `delay`, then fails with
/// `Unavailable` while the wrapper is switched down.
pub struct Flaky<S> {
    inner: S,
    down: AtomicBool,
    delay: Duration,
    calls: AtomicU64,
}

impl<S> Flaky<S> {
    pub fn new(inner: S) -> Self {
        Self::with_delay(inner, Duration::ZERO)
    }

    pub fn with_delay(inner: S, delay: Duration) -> Self {
        Self {
            inner,
            down: AtomicBool::new(false),
            delay,
            calls: AtomicU64::new(0),
        }
    }

    pub fn set_down(&self, down: bool) {
        self.down.store(down, Ordering::SeqCst);
    }

    /// The wrapped store, bypassing fault injection.
    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Calls seen through the wrapper (including failed ones).
    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }

    async fn gate(&self) -> StoreResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.down.load(Ordering::SeqCst) {
            Err(StorageError::unavailable("injected outage"))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl<K, V, S> Map<K, V> for Flaky<S>
where
    K: Send + Sync,
    V: Send + Sync,
    S: Map<K, V>,
{
    async fn try_add(
        &self,
        key: &K,
        value: &V,
        overwrite: bool,
        cancel: &CancellationToken,
    ) -> StoreResult<bool> {
        self.gate().await?;
        self.inner.try_add(key, value, overwrite, cancel).await
    }

    async fn get_or_default(&self, key: &K, cancel: &CancellationToken) -> StoreResult<Option<V>> {
        self.gate().await?;
        self.inner.get_or_default(key, cancel).await
    }

    async fn try_remove(&self, key: &K, cancel: &CancellationToken) -> StoreResult<bool> {
        self.gate().await?;
        self.inner.try_remove(key, cancel).await
    }

    async fn contains_key(&self, key: &K, cancel: &CancellationToken) -> StoreResult<bool> {
        self.gate().await?;
        self.inner.contains_key(key, cancel).await
    }
}

impl<K, V, S> KeysMap<K, V> for Flaky<S>
where
    K: Send + Sync,
    V: Send + Sync,
    S: KeysMap<K, V>,
{
    fn keys<'a>(&'a self, cancel: &'a CancellationToken) -> StoreStream<'a, K> {
        stream::once(self.gate())
            .map_ok(move |()| self.inner.keys(cancel))
            .try_flatten()
            .boxed()
    }
}

#[async_trait]
impl<K, V, S> PropertyMap<K, V> for Flaky<S>
where
    K: Send + Sync,
    V: Send + Sync,
    S: PropertyMap<K, V>,
{
    async fn set_property(
        &self,
        key: &K,
        name: &str,
        value: &Value,
        cancel: &CancellationToken,
    ) -> StoreResult<bool> {
        self.gate().await?;
        self.inner.set_property(key, name, value, cancel).await
    }

    async fn get_property_or_default(
        &self,
        key: &K,
        name: &str,
        cancel: &CancellationToken,
    ) -> StoreResult<Option<Value>> {
        self.gate().await?;
        self.inner.get_property_or_default(key, name, cancel).await
    }

    async fn merge(&self, key: &K, value: &V, cancel: &CancellationToken) -> StoreResult<bool> {
        self.gate().await?;
        self.inner.merge(key, value, cancel).await
    }
}

#[async_trait]
impl<T, S> Set<T> for Flaky<S>
where
    T: Send + Sync,
    S: Set<T>,
{
    async fn add(&self, value: &T, cancel: &CancellationToken) -> StoreResult<()> {
        self.gate().await?;
        self.inner.add(value, cancel).await
    }

    async fn try_remove(&self, value: &T, cancel: &CancellationToken) -> StoreResult<bool> {
        self.gate().await?;
        self.inner.try_remove(value, cancel).await
    }

    async fn contains(&self, value: &T, cancel: &CancellationToken) -> StoreResult<bool> {
        self.gate().await?;
        self.inner.contains(value, cancel).await
    }

    async fn length(&self, cancel: &CancellationToken) -> StoreResult<u64> {
        self.gate().await?;
        self.inner.length(cancel).await
    }

    fn enumerate<'a>(&'a self, cancel: &'a CancellationToken) -> StoreStream<'a, T> {
        stream::once(self.gate())
            .map_ok(move |()| self.inner.enumerate(cancel))
            .try_flatten()
            .boxed()
    }
}

#[async_trait]
impl<T, S> Queue<T> for Flaky<S>
where
    T: Send + Sync,
    S: Queue<T>,
{
    async fn enqueue(&self, item: &T, cancel: &CancellationToken) -> StoreResult<()> {
        self.gate().await?;
        self.inner.enqueue(item, cancel).await
    }

    async fn dequeue_or_default(&self, cancel: &CancellationToken) -> StoreResult<Option<T>> {
        self.gate().await?;
        self.inner.dequeue_or_default(cancel).await
    }

    async fn length(&self, cancel: &CancellationToken) -> StoreResult<u64> {
        self.gate().await?;
        self.inner.length(cancel).await
    }
}

#[async_trait]
impl<T, S> SnapshotQueue<T> for Flaky<S>
where
    T: Send + Sync,
    S: SnapshotQueue<T>,
{
    async fn snapshot(&self, cancel: &CancellationToken) -> StoreResult<Vec<T>> {
        self.gate().await?;
        self.inner.snapshot(cancel).await
    }
}

#[async_trait]
impl<T, S> BlockingQueue<T> for Flaky<S>
where
    T: Send + Sync,
    S: BlockingQueue<T>,
{
    async fn dequeue(&self, cancel: &CancellationToken) -> StoreResult<T> {
        self.gate().await?;
        self.inner.dequeue(cancel).await
    }
}
