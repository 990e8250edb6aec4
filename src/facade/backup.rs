// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Backup-pair facades for maps, property maps and sets.
//!
//! | Contract method            | Dispatch |
//! |----------------------------|----------|
//! | `try_add`, `try_remove`    | write    |
//! | `set_property`, `merge`    | write    |
//! | `add`                      | write    |
//! | everything else            | query    |
//!
//! Streams (`keys`, `enumerate`) are collected from one side before being
//! handed out, so a fallback can happen before the first item is yielded.

use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use futures::{stream, FutureExt, StreamExt, TryStreamExt};
use serde_json::Value;

use crate::cancel::CancellationToken;
use crate::config::PairConfig;
use crate::storage::traits::{
    KeysMap, Map, PropertyMap, Set, StorageError, StoreResult, StoreStream,
};
use crate::strategy::BackupStrategy;
use crate::sync::{IntersectionMapSynchronizer, IntersectionSetSynchronizer, Synchronizer};

/// Map stored on a primary and a backup.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use tandem_store::{BackupMap, CancellationToken, Map, MemoryMap, PairConfig};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let primary = Arc::new(MemoryMap::new());
/// let backup = Arc::new(MemoryMap::new());
/// let map: BackupMap<String, u32, MemoryMap<String, u32>> =
///     BackupMap::new(primary.clone(), backup.clone(), &PairConfig::default());
///
/// let cancel = CancellationToken::none();
/// map.try_add(&"u1".to_string(), &1, false, &cancel).await.unwrap();
/// assert_eq!(backup.get_or_default(&"u1".to_string(), &cancel).await.unwrap(), Some(1));
/// # }
/// ```
pub struct BackupMap<K, V, S: ?Sized> {
    strategy: BackupStrategy<S>,
    _marker: PhantomData<fn() -> (K, V)>,
}

/// A [`BackupMap`] over property stores; it implements [`PropertyMap`]
/// whenever both sides do.
pub type BackupPropertyMap<K, V, S> = BackupMap<K, V, S>;

impl<K, V, S> BackupMap<K, V, S>
where
    K: Ord + Send + Sync + 'static,
    V: Send + Sync + 'static,
    S: KeysMap<K, V> + ?Sized + 'static,
{
    /// Build a pair repaired by an [`IntersectionMapSynchronizer`].
    pub fn new(primary: Arc<S>, backup: Arc<S>, config: &PairConfig) -> Self {
        Self::with_synchronizer(
            primary,
            backup,
            Arc::new(IntersectionMapSynchronizer::<K, V>::new()),
            config,
        )
    }
}

impl<K, V, S: ?Sized> BackupMap<K, V, S> {
    pub fn with_synchronizer(
        primary: Arc<S>,
        backup: Arc<S>,
        synchronizer: Arc<dyn Synchronizer<S>>,
        config: &PairConfig,
    ) -> Self {
        Self::from_strategy(BackupStrategy::new(
            primary,
            backup,
            synchronizer,
            config.sync_timeout(),
        ))
    }

    pub fn from_strategy(strategy: BackupStrategy<S>) -> Self {
        Self {
            strategy,
            _marker: PhantomData,
        }
    }

    pub fn strategy(&self) -> &BackupStrategy<S> {
        &self.strategy
    }
}

#[async_trait]
impl<K, V, S> Map<K, V> for BackupMap<K, V, S>
where
    K: Send + Sync,
    V: Send + Sync,
    S: Map<K, V> + ?Sized,
{
    async fn try_add(
        &self,
        key: &K,
        value: &V,
        overwrite: bool,
        cancel: &CancellationToken,
    ) -> StoreResult<bool> {
        self.strategy
            .execute_write("try_add", cancel, |s| s.try_add(key, value, overwrite, cancel))
            .await
    }

    async fn get_or_default(&self, key: &K, cancel: &CancellationToken) -> StoreResult<Option<V>> {
        self.strategy
            .execute_query("get_or_default", cancel, |s| s.get_or_default(key, cancel))
            .await
    }

    async fn try_remove(&self, key: &K, cancel: &CancellationToken) -> StoreResult<bool> {
        self.strategy
            .execute_write("try_remove", cancel, |s| s.try_remove(key, cancel))
            .await
    }

    async fn contains_key(&self, key: &K, cancel: &CancellationToken) -> StoreResult<bool> {
        self.strategy
            .execute_query("contains_key", cancel, |s| s.contains_key(key, cancel))
            .await
    }
}

impl<K, V, S> KeysMap<K, V> for BackupMap<K, V, S>
where
    K: Send + Sync,
    V: Send + Sync,
    S: KeysMap<K, V> + ?Sized,
{
    fn keys<'a>(&'a self, cancel: &'a CancellationToken) -> StoreStream<'a, K> {
        let collected = self.strategy.execute_query("keys", cancel, move |s| {
            s.keys(cancel).try_collect::<Vec<K>>().boxed()
        });
        stream::once(collected)
            .map_ok(|keys| stream::iter(keys.into_iter().map(Ok::<_, StorageError>)))
            .try_flatten()
            .boxed()
    }
}

#[async_trait]
impl<K, V, S> PropertyMap<K, V> for BackupMap<K, V, S>
where
    K: Send + Sync,
    V: Send + Sync,
    S: PropertyMap<K, V> + ?Sized,
{
    async fn set_property(
        &self,
        key: &K,
        name: &str,
        value: &Value,
        cancel: &CancellationToken,
    ) -> StoreResult<bool> {
        self.strategy
            .execute_write("set_property", cancel, |s| s.set_property(key, name, value, cancel))
            .await
    }

    async fn get_property_or_default(
        &self,
        key: &K,
        name: &str,
        cancel: &CancellationToken,
    ) -> StoreResult<Option<Value>> {
        self.strategy
            .execute_query("get_property_or_default", cancel, |s| {
                s.get_property_or_default(key, name, cancel)
            })
            .await
    }

    async fn merge(&self, key: &K, value: &V, cancel: &CancellationToken) -> StoreResult<bool> {
        self.strategy
            .execute_write("merge", cancel, |s| s.merge(key, value, cancel))
            .await
    }
}

/// Set stored on a primary and a backup.
pub struct BackupSet<T, S: ?Sized> {
    strategy: BackupStrategy<S>,
    _marker: PhantomData<fn() -> T>,
}

impl<T, S> BackupSet<T, S>
where
    T: Ord + Send + Sync + 'static,
    S: Set<T> + ?Sized + 'static,
{
    /// Build a pair repaired by an [`IntersectionSetSynchronizer`].
    pub fn new(primary: Arc<S>, backup: Arc<S>, config: &PairConfig) -> Self {
        Self::with_synchronizer(
            primary,
            backup,
            Arc::new(IntersectionSetSynchronizer::<T>::new()),
            config,
        )
    }
}

impl<T, S: ?Sized> BackupSet<T, S> {
    pub fn with_synchronizer(
        primary: Arc<S>,
        backup: Arc<S>,
        synchronizer: Arc<dyn Synchronizer<S>>,
        config: &PairConfig,
    ) -> Self {
        Self::from_strategy(BackupStrategy::new(
            primary,
            backup,
            synchronizer,
            config.sync_timeout(),
        ))
    }

    pub fn from_strategy(strategy: BackupStrategy<S>) -> Self {
        Self {
            strategy,
            _marker: PhantomData,
        }
    }

    pub fn strategy(&self) -> &BackupStrategy<S> {
        &self.strategy
    }
}

#[async_trait]
impl<T, S> Set<T> for BackupSet<T, S>
where
    T: Send + Sync,
    S: Set<T> + ?Sized,
{
    async fn add(&self, value: &T, cancel: &CancellationToken) -> StoreResult<()> {
        self.strategy
            .execute_write("add", cancel, |s| s.add(value, cancel))
            .await
    }

    async fn try_remove(&self, value: &T, cancel: &CancellationToken) -> StoreResult<bool> {
        self.strategy
            .execute_write("try_remove", cancel, |s| s.try_remove(value, cancel))
            .await
    }

    async fn contains(&self, value: &T, cancel: &CancellationToken) -> StoreResult<bool> {
        self.strategy
            .execute_query("contains", cancel, |s| s.contains(value, cancel))
            .await
    }

    async fn length(&self, cancel: &CancellationToken) -> StoreResult<u64> {
        self.strategy
            .execute_query("length", cancel, |s| s.length(cancel))
            .await
    }

    fn enumerate<'a>(&'a self, cancel: &'a CancellationToken) -> StoreStream<'a, T> {
        let collected = self.strategy.execute_query("enumerate", cancel, move |s| {
            s.enumerate(cancel).try_collect::<Vec<T>>().boxed()
        });
        stream::once(collected)
            .map_ok(|items| stream::iter(items.into_iter().map(Ok::<_, StorageError>)))
            .try_flatten()
            .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::memory::{MemoryMap, MemoryPropertyMap, MemorySet};
    use crate::test_support::Flaky;
    use serde::{Deserialize, Serialize};
    use serde_json::json;

    fn none() -> CancellationToken {
        CancellationToken::none()
    }

    fn config() -> PairConfig {
        PairConfig {
            sync_timeout_ms: 50,
            ..Default::default()
        }
    }

    type Store = Flaky<MemoryMap<String, String>>;

    fn map() -> (Arc<Store>, Arc<Store>, BackupMap<String, String, Store>) {
        let primary = Arc::new(Flaky::new(MemoryMap::new()));
        let backup = Arc::new(Flaky::new(MemoryMap::new()));
        let map = BackupMap::<String, String, Store>::new(primary.clone(), backup.clone(), &config());
        (primary, backup, map)
    }

    fn s(value: &str) -> String {
        value.to_string()
    }

    #[tokio::test]
    async fn test_write_reaches_both_and_outage_leaves_primary_committed() {
        let (primary, backup, map) = map();
        let cancel = none();

        assert!(map.try_add(&s("u1"), &s("v1"), false, &cancel).await.unwrap());
        assert_eq!(primary.inner().get_or_default(&s("u1"), &cancel).await.unwrap(), Some(s("v1")));
        assert_eq!(backup.inner().get_or_default(&s("u1"), &cancel).await.unwrap(), Some(s("v1")));

        backup.set_down(true);
        let err = map.try_add(&s("u2"), &s("v2"), false, &cancel).await.unwrap_err();

        assert!(err.is_unavailable());
        assert_eq!(primary.inner().get_or_default(&s("u2"), &cancel).await.unwrap(), Some(s("v2")));
        assert_eq!(backup.inner().get_or_default(&s("u2"), &cancel).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_queries_fall_back() {
        let (primary, _backup, map) = map();
        let cancel = none();
        map.try_add(&s("k"), &s("v"), false, &cancel).await.unwrap();
        primary.set_down(true);

        assert_eq!(map.get_or_default(&s("k"), &cancel).await.unwrap(), Some(s("v")));
        assert!(map.contains_key(&s("k"), &cancel).await.unwrap());
        let keys: Vec<String> = map.keys(&cancel).try_collect().await.unwrap();
        assert_eq!(keys, vec![s("k")]);
    }

    #[tokio::test]
    async fn test_remove_is_a_write() {
        let (_primary, backup, map) = map();
        let cancel = none();
        map.try_add(&s("k"), &s("v"), false, &cancel).await.unwrap();
        backup.set_down(true);

        assert!(map.try_remove(&s("k"), &cancel).await.is_err());
        assert!(!map.contains_key(&s("k"), &cancel).await.unwrap());
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Account {
        owner: Option<String>,
        balance: Option<i64>,
    }

    #[tokio::test]
    async fn test_property_map_updates_both_sides() {
        type Props = MemoryPropertyMap<u32, Account>;
        let primary = Arc::new(Props::new());
        let backup = Arc::new(Props::new());
        let map: BackupPropertyMap<u32, Account, Props> =
            BackupPropertyMap::new(primary.clone(), backup.clone(), &config());
        let cancel = none();

        let account = Account { owner: Some(s("ana")), balance: Some(10) };
        map.try_add(&1, &account, false, &cancel).await.unwrap();
        assert!(map.set_property(&1, "balance", &json!(25), &cancel).await.unwrap());
        assert!(map.merge(&1, &Account { owner: Some(s("bo")), balance: None }, &cancel).await.unwrap());

        let expected = Account { owner: Some(s("bo")), balance: Some(25) };
        assert_eq!(primary.get_or_default(&1, &cancel).await.unwrap(), Some(expected.clone()));
        assert_eq!(backup.get_or_default(&1, &cancel).await.unwrap(), Some(expected));
        assert_eq!(
            map.get_property_or_default(&1, "owner", &cancel).await.unwrap(),
            Some(json!("bo"))
        );
    }

    #[tokio::test]
    async fn test_property_updates_on_absent_key_create_nothing() {
        type Props = MemoryPropertyMap<u32, Account>;
        let primary = Arc::new(Props::new());
        let backup = Arc::new(Props::new());
        let map: BackupPropertyMap<u32, Account, Props> =
            BackupPropertyMap::new(primary.clone(), backup.clone(), &config());
        let cancel = none();

        let partial = Account { owner: Some(s("ghost")), balance: None };
        assert!(!map.merge(&9, &partial, &cancel).await.unwrap());
        assert!(!map.set_property(&9, "balance", &json!(1), &cancel).await.unwrap());
        assert!(primary.is_empty());
        assert!(backup.is_empty());
    }

    #[tokio::test]
    async fn test_set_pair() {
        type Items = Flaky<MemorySet<u8>>;
        let primary: Arc<Items> = Arc::new(Flaky::new(MemorySet::new()));
        let backup: Arc<Items> = Arc::new(Flaky::new(MemorySet::new()));
        let set = BackupSet::<u8, Items>::new(primary.clone(), backup.clone(), &config());
        let cancel = none();

        set.add(&1, &cancel).await.unwrap();
        set.add(&2, &cancel).await.unwrap();
        assert!(set.try_remove(&1, &cancel).await.unwrap());
        assert_eq!(backup.inner().len(), 1);

        primary.set_down(true);
        assert!(set.contains(&2, &cancel).await.unwrap());
        assert_eq!(set.length(&cancel).await.unwrap(), 1);
        let items: Vec<u8> = set.enumerate(&cancel).try_collect().await.unwrap();
        assert_eq!(items, vec![2]);

        backup.set_down(true);
        let err = set.length(&cancel).await.unwrap_err();
        assert_eq!(err, StorageError::unavailable("injected outage"));
    }
}
