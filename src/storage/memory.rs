// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! In-process backends for every storage contract.
//!
//! These never fail with [`StorageError::Unavailable`]; they are the
//! reference behaviour of the contracts and the building block of tests.

use std::collections::{HashSet, VecDeque};
use std::hash::Hash;

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::{DashMap, DashSet};
use futures::stream;
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::Notify;

use crate::cancel::CancellationToken;
use super::properties;
use super::traits::{
    BlockingQueue, KeysMap, Map, PropertyMap, Queue, Set, SetMap, SnapshotQueue, StorageError,
    StoreResult, StoreStream,
};

pub struct MemoryMap<K, V> {
    data: DashMap<K, V>,
}

impl<K: Eq + Hash, V> MemoryMap<K, V> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            data: DashMap::new(),
        }
    }

    /// Get current entry count
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn clear(&self) {
        self.data.clear();
    }
}

impl<K: Eq + Hash, V> Default for MemoryMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<K, V> Map<K, V> for MemoryMap<K, V>
where
    K: Eq + Hash + Clone + Send + Sync,
    V: Clone + Send + Sync,
{
    async fn try_add(
        &self,
        key: &K,
        value: &V,
        overwrite: bool,
        _cancel: &CancellationToken,
    ) -> StoreResult<bool> {
        match self.data.entry(key.clone()) {
            Entry::Occupied(mut entry) => {
                if overwrite {
                    entry.insert(value.clone());
                }
                Ok(overwrite)
            }
            Entry::Vacant(entry) => {
                entry.insert(value.clone());
                Ok(true)
            }
        }
    }

    async fn get_or_default(&self, key: &K, _cancel: &CancellationToken) -> StoreResult<Option<V>> {
        Ok(self.data.get(key).map(|r| r.value().clone()))
    }

    async fn try_remove(&self, key: &K, _cancel: &CancellationToken) -> StoreResult<bool> {
        Ok(self.data.remove(key).is_some())
    }

    async fn contains_key(&self, key: &K, _cancel: &CancellationToken) -> StoreResult<bool> {
        Ok(self.data.contains_key(key))
    }
}

impl<K, V> KeysMap<K, V> for MemoryMap<K, V>
where
    K: Eq + Hash + Clone + Send + Sync,
    V: Clone + Send + Sync,
{
    fn keys<'a>(&'a self, _cancel: &'a CancellationToken) -> StoreStream<'a, K> {
        // Snapshot first so no shard lock is held while the caller iterates.
        let keys: Vec<K> = self.data.iter().map(|r| r.key().clone()).collect();
        Box::pin(stream::iter(keys.into_iter().map(Ok::<_, StorageError>)))
    }
}

/// A [`MemoryMap`] whose values can be updated property by property.
pub struct MemoryPropertyMap<K, V> {
    inner: MemoryMap<K, V>,
}

impl<K: Eq + Hash, V> MemoryPropertyMap<K, V> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: MemoryMap::new(),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Replace the value under `key` with `update(value)`, if present.
    fn update_with<F>(&self, key: &K, update: F) -> StoreResult<bool>
    where
        F: FnOnce(&V) -> StoreResult<V>,
    {
        match self.inner.data.get_mut(key) {
            Some(mut entry) => {
                let updated = update(entry.value())?;
                *entry.value_mut() = updated;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

impl<K: Eq + Hash, V> Default for MemoryPropertyMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<K, V> Map<K, V> for MemoryPropertyMap<K, V>
where
    K: Eq + Hash + Clone + Send + Sync,
    V: Clone + Send + Sync,
{
    async fn try_add(
        &self,
        key: &K,
        value: &V,
        overwrite: bool,
        cancel: &CancellationToken,
    ) -> StoreResult<bool> {
        self.inner.try_add(key, value, overwrite, cancel).await
    }

    async fn get_or_default(&self, key: &K, cancel: &CancellationToken) -> StoreResult<Option<V>> {
        self.inner.get_or_default(key, cancel).await
    }

    async fn try_remove(&self, key: &K, cancel: &CancellationToken) -> StoreResult<bool> {
        self.inner.try_remove(key, cancel).await
    }

    async fn contains_key(&self, key: &K, cancel: &CancellationToken) -> StoreResult<bool> {
        self.inner.contains_key(key, cancel).await
    }
}

impl<K, V> KeysMap<K, V> for MemoryPropertyMap<K, V>
where
    K: Eq + Hash + Clone + Send + Sync,
    V: Clone + Send + Sync,
{
    fn keys<'a>(&'a self, cancel: &'a CancellationToken) -> StoreStream<'a, K> {
        self.inner.keys(cancel)
    }
}

#[async_trait]
impl<K, V> PropertyMap<K, V> for MemoryPropertyMap<K, V>
where
    K: Eq + Hash + Clone + Send + Sync,
    V: Clone + Serialize + DeserializeOwned + Send + Sync,
{
    async fn set_property(
        &self,
        key: &K,
        name: &str,
        value: &Value,
        _cancel: &CancellationToken,
    ) -> StoreResult<bool> {
        self.update_with(key, |stored| properties::set_property(stored, name, value))
    }

    async fn get_property_or_default(
        &self,
        key: &K,
        name: &str,
        _cancel: &CancellationToken,
    ) -> StoreResult<Option<Value>> {
        match self.inner.data.get(key) {
            Some(entry) => properties::get_property(entry.value(), name),
            None => Ok(None),
        }
    }

    async fn merge(&self, key: &K, value: &V, _cancel: &CancellationToken) -> StoreResult<bool> {
        self.update_with(key, |stored| properties::merge(stored, value))
    }
}

pub struct MemorySet<T> {
    items: DashSet<T>,
}

impl<T: Eq + Hash> MemorySet<T> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            items: DashSet::new(),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl<T: Eq + Hash> Default for MemorySet<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<T> Set<T> for MemorySet<T>
where
    T: Eq + Hash + Clone + Send + Sync,
{
    async fn add(&self, value: &T, _cancel: &CancellationToken) -> StoreResult<()> {
        self.items.insert(value.clone());
        Ok(())
    }

    async fn try_remove(&self, value: &T, _cancel: &CancellationToken) -> StoreResult<bool> {
        Ok(self.items.remove(value).is_some())
    }

    async fn contains(&self, value: &T, _cancel: &CancellationToken) -> StoreResult<bool> {
        Ok(self.items.contains(value))
    }

    async fn length(&self, _cancel: &CancellationToken) -> StoreResult<u64> {
        Ok(self.items.len() as u64)
    }

    fn enumerate<'a>(&'a self, _cancel: &'a CancellationToken) -> StoreStream<'a, T> {
        let items: Vec<T> = self.items.iter().map(|r| r.key().clone()).collect();
        Box::pin(stream::iter(items.into_iter().map(Ok::<_, StorageError>)))
    }
}

pub struct MemorySetMap<K, T> {
    data: DashMap<K, HashSet<T>>,
}

impl<K: Eq + Hash, T> MemorySetMap<K, T> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            data: DashMap::new(),
        }
    }

    /// Number of keys holding at least one item.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl<K: Eq + Hash, T> Default for MemorySetMap<K, T> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<K, T> SetMap<K, T> for MemorySetMap<K, T>
where
    K: Eq + Hash + Clone + Send + Sync,
    T: Eq + Hash + Clone + Send + Sync,
{
    async fn add_item(&self, key: &K, item: &T, _cancel: &CancellationToken) -> StoreResult<()> {
        self.data.entry(key.clone()).or_default().insert(item.clone());
        Ok(())
    }

    async fn try_remove_item(
        &self,
        key: &K,
        item: &T,
        _cancel: &CancellationToken,
    ) -> StoreResult<bool> {
        let removed = match self.data.get_mut(key) {
            Some(mut items) => items.remove(item),
            None => return Ok(false),
        };
        self.data.remove_if(key, |_, items| items.is_empty());
        Ok(removed)
    }

    async fn get_or_default(
        &self,
        key: &K,
        _cancel: &CancellationToken,
    ) -> StoreResult<Option<HashSet<T>>> {
        Ok(self.data.get(key).map(|r| r.value().clone()))
    }

    async fn contains_item(
        &self,
        key: &K,
        item: &T,
        _cancel: &CancellationToken,
    ) -> StoreResult<bool> {
        Ok(self.data.get(key).is_some_and(|items| items.contains(item)))
    }
}

/// FIFO queue with a blocking dequeue.
pub struct MemoryQueue<T> {
    items: Mutex<VecDeque<T>>,
    available: Notify,
}

impl<T> MemoryQueue<T> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            items: Mutex::new(VecDeque::new()),
            available: Notify::new(),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.lock().is_empty()
    }
}

impl<T> Default for MemoryQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<T> Queue<T> for MemoryQueue<T>
where
    T: Clone + Send + Sync,
{
    async fn enqueue(&self, item: &T, _cancel: &CancellationToken) -> StoreResult<()> {
        self.items.lock().push_back(item.clone());
        self.available.notify_one();
        Ok(())
    }

    async fn dequeue_or_default(&self, _cancel: &CancellationToken) -> StoreResult<Option<T>> {
        Ok(self.items.lock().pop_front())
    }

    async fn length(&self, _cancel: &CancellationToken) -> StoreResult<u64> {
        Ok(self.items.lock().len() as u64)
    }
}

#[async_trait]
impl<T> SnapshotQueue<T> for MemoryQueue<T>
where
    T: Clone + Send + Sync,
{
    async fn snapshot(&self, _cancel: &CancellationToken) -> StoreResult<Vec<T>> {
        Ok(self.items.lock().iter().cloned().collect())
    }
}

#[async_trait]
impl<T> BlockingQueue<T> for MemoryQueue<T>
where
    T: Clone + Send + Sync,
{
    async fn dequeue(&self, cancel: &CancellationToken) -> StoreResult<T> {
        loop {
            let notified = self.available.notified();
            tokio::pin!(notified);
            // Register interest before checking, so an enqueue between the
            // check and the wait still wakes us.
            notified.as_mut().enable();

            let next = self.items.lock().pop_front();
            if let Some(item) = next {
                return Ok(item);
            }

            tokio::select! {
                _ = &mut notified => {}
                _ = cancel.cancelled() => return Err(StorageError::Cancelled),
            }
        }
    }
}
