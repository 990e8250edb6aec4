// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Backup pair: durability through writing both stores, availability through
//! reading the backup when the primary is down.
//!
//! Writes go to the primary, then to the backup. A failure on either side is
//! the caller's failure, and nothing is rolled back: a primary that committed
//! stays committed and the pair diverges until the next repair.
//!
//! Queries go to the primary. Only [`StorageError::Unavailable`] sends them to
//! the backup, after which one synchronization session runs so later reads are
//! more likely to agree. The session's outcome never changes the read result.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::cancel::CancellationToken;
use crate::metrics;
use crate::storage::traits::{StoreFuture, StoreResult};
use crate::sync::{SyncReport, Synchronizer};

const STRATEGY: &str = "backup";

pub struct BackupStrategy<S: ?Sized> {
    primary: Arc<S>,
    backup: Arc<S>,
    synchronizer: Arc<dyn Synchronizer<S>>,
    sync_timeout: Duration,
}

impl<S: ?Sized> BackupStrategy<S> {
    pub fn new(
        primary: Arc<S>,
        backup: Arc<S>,
        synchronizer: Arc<dyn Synchronizer<S>>,
        sync_timeout: Duration,
    ) -> Self {
        Self {
            primary,
            backup,
            synchronizer,
            sync_timeout,
        }
    }

    pub fn primary(&self) -> &Arc<S> {
        &self.primary
    }

    pub fn backup(&self) -> &Arc<S> {
        &self.backup
    }

    #[must_use]
    pub fn sync_timeout(&self) -> Duration {
        self.sync_timeout
    }
}

impl<S: ?Sized + Send + Sync> BackupStrategy<S> {
    /// Run a write on the primary, then on the backup.
    ///
    /// Returns the primary's result once both sides accepted the write.
    pub async fn execute_write<'a, T, F>(
        &'a self,
        operation: &'static str,
        cancel: &CancellationToken,
        op: F,
    ) -> StoreResult<T>
    where
        F: Fn(&'a S) -> StoreFuture<'a, T>,
    {
        let fut = op(self.primary.as_ref());
        let result = match cancel.guard(fut).await {
            Ok(result) => result,
            Err(e) => {
                warn!(operation, error = %e, "Backup pair write failed on primary");
                metrics::record_write_failure(STRATEGY, "primary");
                return Err(e);
            }
        };

        let fut = op(self.backup.as_ref());
        if let Err(e) = cancel.guard(fut).await {
            // Primary already committed; the pair now diverges until repaired.
            warn!(operation, error = %e, "Backup pair write failed on backup");
            metrics::record_write_failure(STRATEGY, "backup");
            return Err(e);
        }

        Ok(result)
    }

    /// Run a query on the primary, falling back to the backup when the primary
    /// is unavailable.
    ///
    /// A fallback read also runs one repair session before returning, so each
    /// fallback can add up to the sync timeout of latency on top of both reads.
    pub async fn execute_query<'a, T, F>(
        &'a self,
        operation: &'static str,
        cancel: &CancellationToken,
        op: F,
    ) -> StoreResult<T>
    where
        F: Fn(&'a S) -> StoreFuture<'a, T>,
    {
        let fut = op(self.primary.as_ref());
        let error = match cancel.guard(fut).await {
            Err(e) if e.is_unavailable() => e,
            other => return other,
        };

        warn!(operation, error = %error, "Primary unavailable, querying backup");
        metrics::record_fallback(STRATEGY, operation);

        let fut = op(self.backup.as_ref());
        let result = cancel.guard(fut).await;
        if matches!(&result, Err(e) if e.is_cancelled()) {
            return result;
        }

        let report = self.synchronize().await;
        debug!(operation, outcome = %report.outcome, "Post-fallback repair finished");
        result
    }

    /// One repair session between primary and backup, bounded by the pair's
    /// sync timeout.
    pub async fn synchronize(&self) -> SyncReport {
        self.synchronizer
            .synchronize(self.primary.as_ref(), self.backup.as_ref(), self.sync_timeout)
            .await
    }
}
