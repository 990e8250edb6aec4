// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Synchronizers: best-effort reconciliation of two stores under a deadline.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                     Synchronizer Module                      │
//! ├──────────────────────────────────────────────────────────────┤
//! │  intersection.rs - both ways, keys/items missing on one side │
//! │  └─ IntersectionMapSynchronizer (backup maps)                │
//! │  └─ IntersectionSetSynchronizer (backup sets)                │
//! │  overwrite.rs    - one way, source value -> CacheEntry       │
//! │  └─ OverwriteMapSynchronizer (cache maps)                    │
//! │  copy.rs         - one way, master backlog -> slave queue    │
//! │  └─ CopyQueueSynchronizer (replicated queues)                │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! A synchronizer never runs past its budget and never fails: the outcome of
//! a session is a [`SyncReport`]. Store errors met along the way are counted
//! and the session moves on.

pub mod copy;
pub mod intersection;
pub mod overwrite;

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::storage::traits::{StorageError, StoreResult};

pub use copy::CopyQueueSynchronizer;
pub use intersection::{IntersectionMapSynchronizer, IntersectionSetSynchronizer};
pub use overwrite::OverwriteMapSynchronizer;

/// Reconciles `b` with `a` (or both ways) within `budget`.
#[async_trait]
pub trait Synchronizer<A: ?Sized, B: ?Sized = A>: Send + Sync {
    async fn synchronize(&self, a: &A, b: &B, budget: Duration) -> SyncReport;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Every pending item was processed.
    Completed,
    /// Finished in time, but some store steps failed.
    Partial,
    /// Deadline reached with work left.
    TimedOut,
}

impl SyncOutcome {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Partial => "partial",
            Self::TimedOut => "timed_out",
        }
    }
}

impl std::fmt::Display for SyncOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of one synchronization session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
    pub outcome: SyncOutcome,
    /// Items written to the target side(s)
    pub copied: u64,
    /// Stale items dropped from the target side
    pub removed: u64,
    /// Store steps that failed
    pub failed: u64,
    pub elapsed: Duration,
}

impl SyncReport {
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.outcome == SyncOutcome::Completed
    }
}

// Deadline used when the budget overflows `Instant`.
const FAR_FUTURE: Duration = Duration::from_secs(365 * 24 * 3600);

/// State of a single reconciliation attempt. Lives for one `synchronize` call.
#[derive(Debug)]
pub struct SyncSession {
    synchronizer: &'static str,
    started: Instant,
    deadline: Instant,
    copied: u64,
    removed: u64,
    failed: u64,
}

impl SyncSession {
    #[must_use]
    pub fn start(synchronizer: &'static str, budget: Duration) -> Self {
        let started = Instant::now();
        let deadline = started
            .checked_add(budget)
            .unwrap_or_else(|| started + FAR_FUTURE);
        Self {
            synchronizer,
            started,
            deadline,
            copied: 0,
            removed: 0,
            failed: 0,
        }
    }

    #[must_use]
    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    #[must_use]
    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.deadline
    }

    /// Run one store step against the deadline. `None` means the deadline
    /// passed before or while the step ran.
    pub async fn step<T, F>(&self, operation: F) -> Option<StoreResult<T>>
    where
        F: Future<Output = StoreResult<T>>,
    {
        if self.is_expired() {
            return None;
        }
        tokio::time::timeout_at(self.deadline, operation).await.ok()
    }

    pub fn record_copied(&mut self) {
        self.copied += 1;
    }

    pub fn record_removed(&mut self) {
        self.removed += 1;
    }

    pub fn record_failure(&mut self, error: &StorageError) {
        self.failed += 1;
        debug!(synchronizer = self.synchronizer, error = %error, "Synchronization step failed");
    }

    /// Close a session that ran out of work before its deadline.
    #[must_use]
    pub fn finish(self) -> SyncReport {
        let outcome = if self.failed > 0 {
            SyncOutcome::Partial
        } else {
            SyncOutcome::Completed
        };
        self.close(outcome)
    }

    /// Close a session that hit its deadline.
    #[must_use]
    pub fn time_out(self) -> SyncReport {
        self.close(SyncOutcome::TimedOut)
    }

    fn close(self, outcome: SyncOutcome) -> SyncReport {
        let elapsed = self.started.elapsed();
        match outcome {
            SyncOutcome::Completed => debug!(
                synchronizer = self.synchronizer,
                copied = self.copied,
                removed = self.removed,
                elapsed_ms = elapsed.as_millis() as u64,
                "Synchronization completed"
            ),
            _ => warn!(
                synchronizer = self.synchronizer,
                outcome = %outcome,
                copied = self.copied,
                removed = self.removed,
                failed = self.failed,
                elapsed_ms = elapsed.as_millis() as u64,
                "Synchronization incomplete"
            ),
        }
        crate::metrics::record_sync_session(self.synchronizer, outcome.as_str(), elapsed, self.copied);

        SyncReport {
            outcome,
            copied: self.copied,
            removed: self.removed,
            failed: self.failed,
            elapsed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_display() {
        assert_eq!(SyncOutcome::Completed.to_string(), "completed");
        assert_eq!(SyncOutcome::Partial.to_string(), "partial");
        assert_eq!(SyncOutcome::TimedOut.to_string(), "timed_out");
    }

    #[tokio::test(start_paused = true)]
    async fn test_session_outcomes() {
        let mut session = SyncSession::start("test", Duration::from_secs(1));
        session.record_copied();
        let report = session.finish();
        assert!(report.is_complete());
        assert_eq!(report.copied, 1);

        let mut session = SyncSession::start("test", Duration::from_secs(1));
        session.record_failure(&StorageError::unavailable("down"));
        assert_eq!(session.finish().outcome, SyncOutcome::Partial);

        let session = SyncSession::start("test", Duration::from_secs(1));
        assert_eq!(session.time_out().outcome, SyncOutcome::TimedOut);
    }

    #[tokio::test(start_paused = true)]
    async fn test_step_stops_at_deadline() {
        let session = SyncSession::start("test", Duration::from_millis(10));

        let slow = session
            .step(async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(())
            })
            .await;
        assert!(slow.is_none());
        assert!(session.is_expired());

        // Once expired, even instant steps are skipped.
        assert!(session.step(async { Ok(1) }).await.is_none());
    }

    #[tokio::test]
    async fn test_unbounded_budget_does_not_overflow() {
        let session = SyncSession::start("test", Duration::MAX);
        assert!(!session.is_expired());
        assert_eq!(session.step(async { Ok(5) }).await, Some(Ok(5)));
    }
}
