// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Storage contracts and the in-memory backends.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                       Storage Module                         │
//! ├──────────────────────────────────────────────────────────────┤
//! │  traits.rs     - Map, KeysMap, PropertyMap, Set, SetMap,     │
//! │                  Queue, SnapshotQueue, BlockingQueue         │
//! │  entry.rs      - CacheEntry: value + expiration instant      │
//! │  properties.rs - JSON property access for property maps      │
//! │  memory.rs     - DashMap / Mutex backed implementations      │
//! └──────────────────────────────────────────────────────────────┘
//! ```

pub mod entry;
pub mod memory;
pub mod properties;
pub mod traits;
