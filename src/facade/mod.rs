// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Typed facades: strategy pairs exposed as ordinary contract implementations.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        Facade Module                         │
//! ├──────────────────────────────────────────────────────────────┤
//! │  backup.rs - BackupMap (Map, KeysMap, PropertyMap)           │
//! │              BackupSet (Set)                                 │
//! │  cache.rs  - CacheMap (Map, KeysMap)                         │
//! │  queue.rs  - FallbackQueue (Queue, SnapshotQueue,            │
//! │              BlockingQueue)                                  │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Each facade decides which contract methods are writes and which are
//! queries, then hands them to its strategy. Because facades implement the
//! contracts themselves, they nest: a [`BackupMap`] can be the source of a
//! [`CacheMap`].

pub mod backup;
pub mod cache;
pub mod queue;

pub use backup::{BackupMap, BackupPropertyMap, BackupSet};
pub use cache::CacheMap;
pub use queue::{FallbackBlockingQueue, FallbackQueue};
