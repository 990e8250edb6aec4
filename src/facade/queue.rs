// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Replication-pair facade for queues.
//!
//! Every queue operation, blocking `dequeue` included, runs on the master and
//! falls back to the slave on an outage.

use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::task::JoinHandle;

use crate::cancel::CancellationToken;
use crate::config::PairConfig;
use crate::storage::traits::{BlockingQueue, Queue, SnapshotQueue, StoreResult};
use crate::strategy::ReplicationStrategy;
use crate::sync::{CopyQueueSynchronizer, Synchronizer};

pub struct FallbackQueue<T, S: ?Sized> {
    strategy: Arc<ReplicationStrategy<S>>,
    replication_interval: Duration,
    _marker: PhantomData<fn() -> T>,
}

/// A [`FallbackQueue`] over blocking queues; it implements [`BlockingQueue`]
/// whenever both sides do.
pub type FallbackBlockingQueue<T, S> = FallbackQueue<T, S>;

impl<T, S> FallbackQueue<T, S>
where
    T: PartialEq + Send + Sync + 'static,
    S: SnapshotQueue<T> + ?Sized + 'static,
{
    /// Build a pair kept warm by a [`CopyQueueSynchronizer`].
    pub fn new(master: Arc<S>, slave: Arc<S>, config: &PairConfig) -> Self {
        Self::with_synchronizer(
            master,
            slave,
            Arc::new(CopyQueueSynchronizer::<T>::new()),
            config,
        )
    }
}

impl<T, S: ?Sized> FallbackQueue<T, S> {
    pub fn with_synchronizer(
        master: Arc<S>,
        slave: Arc<S>,
        synchronizer: Arc<dyn Synchronizer<S>>,
        config: &PairConfig,
    ) -> Self {
        let strategy = ReplicationStrategy::new(master, slave, synchronizer, config.sync_timeout());
        Self {
            strategy: Arc::new(strategy),
            replication_interval: config.replication_interval(),
            _marker: PhantomData,
        }
    }

    pub fn strategy(&self) -> &Arc<ReplicationStrategy<S>> {
        &self.strategy
    }
}

impl<T, S: ?Sized + Send + Sync + 'static> FallbackQueue<T, S> {
    /// Start forwarding the master's backlog every
    /// `replication_interval_ms` until `shutdown` fires.
    pub fn start_replication(&self, shutdown: CancellationToken) -> JoinHandle<()> {
        self.strategy
            .clone()
            .spawn_synchronization(self.replication_interval, shutdown)
    }
}

#[async_trait]
impl<T, S> Queue<T> for FallbackQueue<T, S>
where
    T: Send + Sync,
    S: Queue<T> + ?Sized,
{
    async fn enqueue(&self, item: &T, cancel: &CancellationToken) -> StoreResult<()> {
        self.strategy
            .execute_with_fallback("enqueue", cancel, |s| s.enqueue(item, cancel))
            .await
    }

    async fn dequeue_or_default(&self, cancel: &CancellationToken) -> StoreResult<Option<T>> {
        self.strategy
            .execute_with_fallback("dequeue_or_default", cancel, |s| s.dequeue_or_default(cancel))
            .await
    }

    async fn length(&self, cancel: &CancellationToken) -> StoreResult<u64> {
        self.strategy
            .execute_with_fallback("length", cancel, |s| s.length(cancel))
            .await
    }
}

#[async_trait]
impl<T, S> SnapshotQueue<T> for FallbackQueue<T, S>
where
    T: Send + Sync,
    S: SnapshotQueue<T> + ?Sized,
{
    async fn snapshot(&self, cancel: &CancellationToken) -> StoreResult<Vec<T>> {
        self.strategy
            .execute_with_fallback("snapshot", cancel, |s| s.snapshot(cancel))
            .await
    }
}

#[async_trait]
impl<T, S> BlockingQueue<T> for FallbackQueue<T, S>
where
    T: Send + Sync,
    S: BlockingQueue<T> + ?Sized,
{
    async fn dequeue(&self, cancel: &CancellationToken) -> StoreResult<T> {
        self.strategy
            .execute_with_fallback("dequeue", cancel, |s| s.dequeue(cancel))
            .await
    }
}
