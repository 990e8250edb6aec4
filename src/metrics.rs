// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Metrics instrumentation for strategy pairs.
//!
//! Uses the `metrics` crate for backend-agnostic metrics collection.
//! The host application is responsible for choosing the exporter (Prometheus, OTEL, etc.)
//!
//! # Metric Naming Convention
//! - `tandem_store_` prefix for all metrics
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//!
//! # Labels
//! - `strategy`: backup, cache, replication
//! - `operation`: contract method name (get_or_default, enqueue, ...)
//! - `synchronizer`: intersection_map, intersection_set, overwrite_map, copy_queue
//! - `outcome`: completed, partial, timed_out / hit, miss, expired, error

use metrics::{counter, histogram};
use std::time::Duration;

/// Record a query or operation that was served by the secondary store
pub fn record_fallback(strategy: &str, operation: &str) {
    counter!(
        "tandem_store_fallbacks_total",
        "strategy" => strategy.to_string(),
        "operation" => operation.to_string()
    )
    .increment(1);
}

/// Record a failed write; `side` is the store that rejected it
pub fn record_write_failure(strategy: &str, side: &str) {
    counter!(
        "tandem_store_write_failures_total",
        "strategy" => strategy.to_string(),
        "side" => side.to_string()
    )
    .increment(1);
}

/// Record the end of a synchronization session
pub fn record_sync_session(synchronizer: &str, outcome: &str, duration: Duration, copied: u64) {
    counter!(
        "tandem_store_sync_sessions_total",
        "synchronizer" => synchronizer.to_string(),
        "outcome" => outcome.to_string()
    )
    .increment(1);
    histogram!(
        "tandem_store_sync_seconds",
        "synchronizer" => synchronizer.to_string()
    )
    .record(duration.as_secs_f64());
    counter!(
        "tandem_store_sync_items_total",
        "synchronizer" => synchronizer.to_string()
    )
    .increment(copied);
}

/// Record a cache probe
pub fn record_cache_lookup(outcome: &str) {
    counter!(
        "tandem_store_cache_lookups_total",
        "outcome" => outcome.to_string()
    )
    .increment(1);
}
