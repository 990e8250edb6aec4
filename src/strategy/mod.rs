// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Strategy pairs: two stores of one contract composed into one logical store.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                       Strategy Module                        │
//! ├──────────────────────────────────────────────────────────────┤
//! │  backup.rs      - write both, read primary then backup       │
//! │  └─ repair: IntersectionMap/SetSynchronizer after fallback   │
//! │  cache.rs       - write source, read cache then source       │
//! │  └─ mirror: OverwriteMapSynchronizer per key                 │
//! │  replication.rs - every op on master, slave on outage        │
//! │  └─ warm-up: CopyQueueSynchronizer on an interval            │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Operations reach a strategy as closures from a store reference to a boxed
//! future (`Fn(&S) -> StoreFuture<T>`), so each strategy runs the same
//! dispatch for every contract method. Every store step is wrapped in the
//! caller's [`CancellationToken::guard`](crate::cancel::CancellationToken::guard);
//! synchronization sessions run on the pair's own timeout instead.

pub mod backup;
pub mod cache;
pub mod replication;

pub use backup::BackupStrategy;
pub use cache::{CacheLookup, CacheStrategy};
pub use replication::ReplicationStrategy;
