// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Storage contracts implemented by every backend and every composed pair.
//!
//! All operations are async, take `&self`, accept a [`CancellationToken`] and
//! are fallible. "Not found" is a value (`Ok(None)` / `Ok(false)`), never an
//! error: only [`StorageError`] means the operation itself failed.

use std::collections::HashSet;
use std::hash::Hash;

use async_trait::async_trait;
use futures::future::BoxFuture;
use futures::stream::BoxStream;
use serde_json::Value;
use thiserror::Error;

use crate::cancel::CancellationToken;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// The backend could not serve the request (network fault, outage).
    #[error("Store unavailable: {0}")]
    Unavailable(String),
    /// The caller's cancellation signal fired.
    #[error("Operation cancelled")]
    Cancelled,
    /// A stored value could not be converted to or from its property form.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl StorageError {
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::Unavailable(reason.into())
    }

    /// Failures that composed stores recover from by falling back.
    #[must_use]
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

pub type StoreResult<T> = Result<T, StorageError>;

/// A boxed storage operation, as handed to the strategy dispatch routines.
pub type StoreFuture<'a, T> = BoxFuture<'a, StoreResult<T>>;

/// A finite, single-pass sequence produced lazily by a store.
pub type StoreStream<'a, T> = BoxStream<'a, StoreResult<T>>;

#[async_trait]
pub trait Map<K, V>: Send + Sync {
    /// Insert `value` under `key`. Returns `false` when the key already exists
    /// and `overwrite` is not set.
    async fn try_add(
        &self,
        key: &K,
        value: &V,
        overwrite: bool,
        cancel: &CancellationToken,
    ) -> StoreResult<bool>;

    async fn get_or_default(&self, key: &K, cancel: &CancellationToken) -> StoreResult<Option<V>>;

    async fn try_remove(&self, key: &K, cancel: &CancellationToken) -> StoreResult<bool>;

    async fn contains_key(&self, key: &K, cancel: &CancellationToken) -> StoreResult<bool>;
}

/// A map that can enumerate its keys.
pub trait KeysMap<K, V>: Map<K, V> {
    fn keys<'a>(&'a self, cancel: &'a CancellationToken) -> StoreStream<'a, K>;
}

/// A map whose values are composite and can be updated one property at a time.
///
/// Properties are the fields of the value's JSON object form.
///
/// `set_property` and `merge` never create an entry: against an absent key
/// they do nothing and return `Ok(false)`.
#[async_trait]
pub trait PropertyMap<K, V>: Map<K, V> {
    async fn set_property(
        &self,
        key: &K,
        name: &str,
        value: &Value,
        cancel: &CancellationToken,
    ) -> StoreResult<bool>;

    async fn get_property_or_default(
        &self,
        key: &K,
        name: &str,
        cancel: &CancellationToken,
    ) -> StoreResult<Option<Value>>;

    /// Apply the non-null properties of `value` over the stored entry,
    /// keeping stored properties that `value` leaves null.
    async fn merge(&self, key: &K, value: &V, cancel: &CancellationToken) -> StoreResult<bool>;
}

#[async_trait]
pub trait Set<T>: Send + Sync {
    async fn add(&self, value: &T, cancel: &CancellationToken) -> StoreResult<()>;

    async fn try_remove(&self, value: &T, cancel: &CancellationToken) -> StoreResult<bool>;

    async fn contains(&self, value: &T, cancel: &CancellationToken) -> StoreResult<bool>;

    async fn length(&self, cancel: &CancellationToken) -> StoreResult<u64>;

    fn enumerate<'a>(&'a self, cancel: &'a CancellationToken) -> StoreStream<'a, T>;
}

/// Maps a key to a set of items.
#[async_trait]
pub trait SetMap<K, T>: Send + Sync
where
    T: Eq + Hash,
{
    async fn add_item(&self, key: &K, item: &T, cancel: &CancellationToken) -> StoreResult<()>;

    /// Removing the last item of a key removes the key.
    async fn try_remove_item(&self, key: &K, item: &T, cancel: &CancellationToken)
        -> StoreResult<bool>;

    async fn get_or_default(
        &self,
        key: &K,
        cancel: &CancellationToken,
    ) -> StoreResult<Option<HashSet<T>>>;

    async fn contains_item(&self, key: &K, item: &T, cancel: &CancellationToken)
        -> StoreResult<bool>;
}

#[async_trait]
pub trait Queue<T>: Send + Sync {
    async fn enqueue(&self, item: &T, cancel: &CancellationToken) -> StoreResult<()>;

    /// Non-blocking: `Ok(None)` when the queue is empty.
    async fn dequeue_or_default(&self, cancel: &CancellationToken) -> StoreResult<Option<T>>;

    async fn length(&self, cancel: &CancellationToken) -> StoreResult<u64>;
}

/// A queue whose backlog can be read without consuming it.
#[async_trait]
pub trait SnapshotQueue<T>: Queue<T> {
    /// Queued items, front first.
    async fn snapshot(&self, cancel: &CancellationToken) -> StoreResult<Vec<T>>;
}

#[async_trait]
pub trait BlockingQueue<T>: Queue<T> {
    /// Wait for an item. Fails with [`StorageError::Cancelled`] once `cancel`
    /// fires while the queue is still empty.
    async fn dequeue(&self, cancel: &CancellationToken) -> StoreResult<T>;
}
