// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Replication pair: a hot standby behind a master.
//!
//! Every operation runs on the master; an unavailable master hands the same
//! operation to the slave. Nothing runs on both. A copy session (on demand,
//! or periodically through [`ReplicationStrategy::spawn_synchronization`])
//! forwards the master's backlog to the slave so a fallback dequeue finds
//! recent items. The master is only read by those sessions, so they can
//! interleave with live traffic.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::cancel::CancellationToken;
use crate::metrics;
use crate::storage::traits::{StoreFuture, StoreResult};
use crate::sync::{SyncReport, Synchronizer};

const STRATEGY: &str = "replication";

// `tokio::time::interval` rejects a zero period.
const MIN_INTERVAL: Duration = Duration::from_millis(1);

pub struct ReplicationStrategy<S: ?Sized> {
    master: Arc<S>,
    slave: Arc<S>,
    synchronizer: Arc<dyn Synchronizer<S>>,
    sync_timeout: Duration,
}

impl<S: ?Sized> ReplicationStrategy<S> {
    pub fn new(
        master: Arc<S>,
        slave: Arc<S>,
        synchronizer: Arc<dyn Synchronizer<S>>,
        sync_timeout: Duration,
    ) -> Self {
        Self {
            master,
            slave,
            synchronizer,
            sync_timeout,
        }
    }

    pub fn master(&self) -> &Arc<S> {
        &self.master
    }

    pub fn slave(&self) -> &Arc<S> {
        &self.slave
    }

    #[must_use]
    pub fn sync_timeout(&self) -> Duration {
        self.sync_timeout
    }
}

impl<S: ?Sized + Send + Sync> ReplicationStrategy<S> {
    /// Run `op` on the master; on an outage run it on the slave instead.
    pub async fn execute_with_fallback<'a, T, F>(
        &'a self,
        operation: &'static str,
        cancel: &CancellationToken,
        op: F,
    ) -> StoreResult<T>
    where
        F: Fn(&'a S) -> StoreFuture<'a, T>,
    {
        let fut = op(self.master.as_ref());
        match cancel.guard(fut).await {
            Err(e) if e.is_unavailable() => {
                warn!(operation, error = %e, "Master unavailable, using slave");
                metrics::record_fallback(STRATEGY, operation);
                let fut = op(self.slave.as_ref());
                cancel.guard(fut).await
            }
            other => other,
        }
    }

    /// One copy session master -> slave, bounded by the pair's sync timeout.
    pub async fn synchronize(&self) -> SyncReport {
        self.synchronizer
            .synchronize(self.master.as_ref(), self.slave.as_ref(), self.sync_timeout)
            .await
    }
}

impl<S: ?Sized + Send + Sync + 'static> ReplicationStrategy<S> {
    /// Run a copy session every `interval` until `shutdown` fires.
    ///
    /// A session in progress when `shutdown` fires is allowed to finish.
    pub fn spawn_synchronization(
        self: Arc<Self>,
        interval: Duration,
        shutdown: CancellationToken,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval.max(MIN_INTERVAL));
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            info!(interval_ms = interval.as_millis() as u64, "Replication synchronization started");

            loop {
                tokio::select! {
                    biased;
                    _ = shutdown.cancelled() => break,
                    _ = ticker.tick() => {
                        let report = self.synchronize().await;
                        debug!(outcome = %report.outcome, copied = report.copied, "Replication tick");
                    }
                }
            }

            info!("Replication synchronization stopped");
        })
    }
}
