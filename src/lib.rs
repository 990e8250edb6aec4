// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! # Tandem Store
//!
//! Generic storage contracts plus a composition layer that binds two stores of
//! the same contract into one logical store.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Typed Facades                           │
//! │  • BackupMap / BackupPropertyMap / BackupSet               │
//! │  • CacheMap                                                │
//! │  • FallbackQueue / FallbackBlockingQueue                   │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                 (operation passed as a closure)
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Strategy Pairs                          │
//! │  • Backup: write both, read primary → backup               │
//! │  • Cache: write source, read cache → source                │
//! │  • Replication: master → slave on outage                   │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                 (bounded by the pair's sync timeout)
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Synchronizers                           │
//! │  • Intersection: copy keys missing on either side          │
//! │  • Overwrite: source value → expiring cache entry          │
//! │  • Copy: master backlog → slave queue                      │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                   Storage Contracts                         │
//! │  • Map, KeysMap, PropertyMap, Set, SetMap                  │
//! │  • Queue, SnapshotQueue, BlockingQueue                     │
//! │  • In-memory backends for all of them                      │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use tandem_store::{BackupMap, CancellationToken, Map, MemoryMap, PairConfig};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = PairConfig {
//!         sync_timeout_ms: 50,
//!         ..Default::default()
//!     };
//!
//!     let primary = Arc::new(MemoryMap::new());
//!     let backup = Arc::new(MemoryMap::new());
//!     let users: BackupMap<String, String, MemoryMap<String, String>> =
//!         BackupMap::new(primary, backup, &config);
//!
//!     let cancel = CancellationToken::none();
//!     users.try_add(&"u1".into(), &"v1".into(), false, &cancel).await.unwrap();
//!
//!     // Served by the primary, or by the backup while the primary is down
//!     let value = users.get_or_default(&"u1".into(), &cancel).await.unwrap();
//!     assert_eq!(value.as_deref(), Some("v1"));
//! }
//! ```
//!
//! ## Consistency
//!
//! Pairs are best-effort. A backup write that fails on the backup leaves the
//! primary committed and reports the failure; a cache mirror that fails is
//! logged and absorbed. Synchronizers repair what they can before their
//! deadline and report the rest as [`SyncOutcome::Partial`] or
//! [`SyncOutcome::TimedOut`]. Concurrent readers may see one side updated
//! before the other.
//!
//! ## Modules
//!
//! - [`storage`]: Contracts, errors, in-memory backends, cache entries
//! - [`sync`]: Synchronizer family and session bookkeeping
//! - [`strategy`]: Backup, cache and replication dispatch
//! - [`facade`]: Contract implementations over strategy pairs
//! - [`cancel`]: Cancellation signal passed to every operation
//! - [`config`]: Pair configuration
//! - [`metrics`]: `metrics`-crate instrumentation

pub mod cancel;
pub mod config;
pub mod facade;
pub mod metrics;
pub mod storage;
pub mod strategy;
pub mod sync;

#[cfg(test)]
pub(crate) mod test_support;

pub use cancel::{CancellationSource, CancellationToken};
pub use config::PairConfig;
pub use facade::{
    BackupMap, BackupPropertyMap, BackupSet, CacheMap, FallbackBlockingQueue, FallbackQueue,
};
pub use storage::entry::CacheEntry;
pub use storage::memory::{MemoryMap, MemoryPropertyMap, MemoryQueue, MemorySet, MemorySetMap};
pub use storage::traits::{
    BlockingQueue, KeysMap, Map, PropertyMap, Queue, Set, SetMap, SnapshotQueue, StorageError,
    StoreFuture, StoreResult, StoreStream,
};
pub use strategy::{BackupStrategy, CacheLookup, CacheStrategy, ReplicationStrategy};
pub use sync::{
    CopyQueueSynchronizer, IntersectionMapSynchronizer, IntersectionSetSynchronizer,
    OverwriteMapSynchronizer, SyncOutcome, SyncReport, SyncSession, Synchronizer,
};
