// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Cache-pair facade for maps.

use std::sync::Arc;

use async_trait::async_trait;

use crate::cancel::CancellationToken;
use crate::config::PairConfig;
use crate::storage::entry::CacheEntry;
use crate::storage::traits::{KeysMap, Map, StoreResult, StoreStream};
use crate::strategy::CacheStrategy;

/// Map backed by an authoritative `source`, read through a `cache` of
/// [`CacheEntry`] values.
///
/// `try_add` and `try_remove` are writes (source, then mirror); `get_or_default`
/// and `contains_key` read through the cache.
pub struct CacheMap<K, V, S: ?Sized, C: ?Sized> {
    strategy: CacheStrategy<K, V, S, C>,
}

impl<K, V, S: ?Sized, C: ?Sized> CacheMap<K, V, S, C> {
    /// TTL and sync timeout come from `config`.
    pub fn new(source: Arc<S>, cache: Arc<C>, config: &PairConfig) -> Self {
        Self::from_strategy(CacheStrategy::new(
            source,
            cache,
            config.cache_expiration(),
            config.sync_timeout(),
        ))
    }

    pub fn from_strategy(strategy: CacheStrategy<K, V, S, C>) -> Self {
        Self { strategy }
    }

    pub fn strategy(&self) -> &CacheStrategy<K, V, S, C> {
        &self.strategy
    }
}

#[async_trait]
impl<K, V, S, C> Map<K, V> for CacheMap<K, V, S, C>
where
    K: Send + Sync,
    V: Clone + Send + Sync,
    S: Map<K, V> + ?Sized,
    C: Map<K, CacheEntry<V>> + ?Sized,
{
    async fn try_add(
        &self,
        key: &K,
        value: &V,
        overwrite: bool,
        cancel: &CancellationToken,
    ) -> StoreResult<bool> {
        self.strategy
            .execute_write("try_add", key, cancel, |s| s.try_add(key, value, overwrite, cancel))
            .await
    }

    async fn get_or_default(&self, key: &K, cancel: &CancellationToken) -> StoreResult<Option<V>> {
        self.strategy.get(key, cancel).await
    }

    async fn try_remove(&self, key: &K, cancel: &CancellationToken) -> StoreResult<bool> {
        self.strategy
            .execute_write("try_remove", key, cancel, |s| s.try_remove(key, cancel))
            .await
    }

    async fn contains_key(&self, key: &K, cancel: &CancellationToken) -> StoreResult<bool> {
        self.strategy.contains_key(key, cancel).await
    }
}

/// Keys are listed from the source; the cache may hold only some of them.
impl<K, V, S, C> KeysMap<K, V> for CacheMap<K, V, S, C>
where
    K: Send + Sync,
    V: Clone + Send + Sync,
    S: KeysMap<K, V> + ?Sized,
    C: Map<K, CacheEntry<V>> + ?Sized,
{
    fn keys<'a>(&'a self, cancel: &'a CancellationToken) -> StoreStream<'a, K> {
        self.strategy.source().keys(cancel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::facade::BackupMap;
    use crate::storage::memory::MemoryMap;
    use crate::test_support::Flaky;
    use futures::TryStreamExt;
    use std::time::Duration;

    fn none() -> CancellationToken {
        CancellationToken::none()
    }

    type Source = Flaky<MemoryMap<u32, String>>;
    type Cache = MemoryMap<u32, CacheEntry<String>>;

    fn map(ttl_ms: Option<u64>) -> CacheMap<u32, String, Source, Cache> {
        let config = PairConfig {
            sync_timeout_ms: 50,
            cache_expiration_ms: ttl_ms,
            ..Default::default()
        };
        CacheMap::new(Arc::new(Flaky::new(MemoryMap::new())), Arc::new(MemoryMap::new()), &config)
    }

    #[tokio::test]
    async fn test_written_value_is_served_from_cache() {
        let map = map(Some(60_000));
        let cancel = none();
        map.try_add(&1, &"one".to_string(), false, &cancel).await.unwrap();

        let source_calls = map.strategy().source().calls();
        assert_eq!(map.get_or_default(&1, &cancel).await.unwrap().as_deref(), Some("one"));
        assert!(map.contains_key(&1, &cancel).await.unwrap());
        assert_eq!(map.strategy().source().calls(), source_calls);
    }

    #[tokio::test]
    async fn test_config_ttl_is_applied() {
        let map = map(Some(60_000));
        assert_eq!(map.strategy().expiration(), Some(Duration::from_secs(60)));

        let cancel = none();
        map.try_add(&1, &"one".to_string(), false, &cancel).await.unwrap();
        let entry = map.strategy().cache().get_or_default(&1, &cancel).await.unwrap().unwrap();
        assert!(entry.expires_at.is_some());
    }

    #[tokio::test]
    async fn test_remove_mirrors_absence() {
        let map = map(None);
        let cancel = none();
        map.try_add(&1, &"one".to_string(), false, &cancel).await.unwrap();

        assert!(map.try_remove(&1, &cancel).await.unwrap());
        assert!(map.strategy().cache().is_empty());
        assert_eq!(map.get_or_default(&1, &cancel).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_keys_come_from_source() {
        let map = map(None);
        let cancel = none();
        map.strategy().source().inner().try_add(&4, &"four".to_string(), false, &cancel).await.unwrap();

        let keys: Vec<u32> = map.keys(&cancel).try_collect().await.unwrap();
        assert_eq!(keys, vec![4]);
        assert!(map.strategy().cache().is_empty());
    }

    #[tokio::test]
    async fn test_cache_over_backup_pair() {
        type Inner = MemoryMap<u32, String>;
        let primary = Arc::new(Inner::new());
        let backup = Arc::new(Inner::new());
        let source = Arc::new(BackupMap::<u32, String, Inner>::new(
            primary.clone(),
            backup.clone(),
            &PairConfig::default(),
        ));
        let cache: Arc<Cache> = Arc::new(MemoryMap::new());
        let map = CacheMap::<u32, String, _, _>::new(source, cache.clone(), &PairConfig::default());
        let cancel = none();

        map.try_add(&7, &"seven".to_string(), false, &cancel).await.unwrap();

        assert!(primary.contains_key(&7, &cancel).await.unwrap());
        assert!(backup.contains_key(&7, &cancel).await.unwrap());
        assert_eq!(cache.len(), 1);
    }
}
