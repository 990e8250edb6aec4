// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! One-way forwarding of a master queue's backlog onto a slave queue.
//!
//! The master is only read (via [`SnapshotQueue::snapshot`]). The slave is
//! kept close to the master's current backlog by alignment: the longest run
//! of the slave backlog that also appears in the master backlog.
//!
//! ```text
//! master:        [c  d  e  f]          slave: [a  b  c  d]
//!                 ^^^^                                ^^^^ aligned
//! slave head a b is stale (consumed on the master)  -> dequeued from slave
//! master e f comes after the aligned run             -> enqueued on slave
//! ```
//!
//! A run found further into the master means the slave served the master's
//! head during a failover; those items are not forwarded again. Slave items
//! behind the run were enqueued while the master was down and stay put. With
//! no run in common the whole slave backlog counts as stale and the master's
//! backlog is forwarded in full. Equal items are not de-duplicated, so
//! repeated values can align ambiguously.

use std::marker::PhantomData;
use std::time::Duration;

use async_trait::async_trait;

use crate::cancel::CancellationToken;
use crate::storage::traits::SnapshotQueue;

use super::{SyncReport, SyncSession, Synchronizer};

const SYNCHRONIZER: &str = "copy_queue";

pub struct CopyQueueSynchronizer<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> CopyQueueSynchronizer<T> {
    #[must_use]
    pub fn new() -> Self {
        Self { _marker: PhantomData }
    }
}

impl<T> Default for CopyQueueSynchronizer<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<T, S> Synchronizer<S> for CopyQueueSynchronizer<T>
where
    T: PartialEq + Send + Sync,
    S: SnapshotQueue<T> + ?Sized,
{
    async fn synchronize(&self, master: &S, slave: &S, budget: Duration) -> SyncReport {
        let mut session = SyncSession::start(SYNCHRONIZER, budget);
        let cancel = CancellationToken::none();

        let backlog = match session.step(master.snapshot(&cancel)).await {
            Some(Ok(items)) => items,
            Some(Err(e)) => {
                session.record_failure(&e);
                return session.finish();
            }
            None => return session.time_out(),
        };
        let replica = match session.step(slave.snapshot(&cancel)).await {
            Some(Ok(items)) => items,
            Some(Err(e)) => {
                session.record_failure(&e);
                return session.finish();
            }
            None => return session.time_out(),
        };

        let alignment = align(&backlog, &replica);

        for _ in 0..alignment.stale {
            match session.step(slave.dequeue_or_default(&cancel)).await {
                Some(Ok(Some(_))) => session.record_removed(),
                // Drained by a consumer since the snapshot.
                Some(Ok(None)) => break,
                Some(Err(e)) => {
                    session.record_failure(&e);
                    break;
                }
                None => return session.time_out(),
            }
        }

        for item in &backlog[alignment.next..] {
            match session.step(slave.enqueue(item, &cancel)).await {
                Some(Ok(())) => session.record_copied(),
                Some(Err(e)) => {
                    // Skipping ahead would reorder the slave.
                    session.record_failure(&e);
                    break;
                }
                None => return session.time_out(),
            }
        }

        session.finish()
    }
}

/// Position of a slave backlog relative to its master's.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Alignment {
    /// Items at the slave's head that the master no longer holds
    pub stale: usize,
    /// Index of the first master item the slave has not seen
    pub next: usize,
}

/// Align the longest run of `replica` with a run of `backlog`. Among
/// equal-length runs the one nearest both heads wins. Slave items after the
/// aligned run were enqueued on the slave alone and are kept.
pub(crate) fn align<T: PartialEq>(backlog: &[T], replica: &[T]) -> Alignment {
    let longest = backlog.len().min(replica.len());
    for n in (1..=longest).rev() {
        for (stale, run) in replica.windows(n).enumerate() {
            if let Some(start) = backlog.windows(n).position(|candidate| candidate == run) {
                return Alignment {
                    stale,
                    next: start + n,
                };
            }
        }
    }
    Alignment {
        stale: replica.len(),
        next: 0,
    }
}
