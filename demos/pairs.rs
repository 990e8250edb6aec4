// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Walk through the three pair kinds over in-memory stores and print the
//! metrics they emit.
//!
//! ```bash
//! RUST_LOG=tandem_store=debug cargo run --example pairs
//! ```

use std::sync::Arc;
use std::time::Duration;

use metrics_util::debugging::DebuggingRecorder;
use tracing::info;

use tandem_store::{
    BackupMap, BlockingQueue, CacheEntry, CacheMap, CancellationSource, CancellationToken,
    FallbackBlockingQueue, Map, MemoryMap, MemoryQueue, PairConfig, Queue, StoreResult,
};

#[tokio::main]
async fn main() -> StoreResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tandem_store=debug".into()),
        )
        .init();

    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    if recorder.install().is_err() {
        tracing::warn!("A metrics recorder is already installed");
    }

    let config: PairConfig = serde_json::from_str(
        r#"{ "sync_timeout_ms": 50, "cache_expiration_ms": 200, "replication_interval_ms": 25 }"#,
    )?;
    let cancel = CancellationToken::none();

    // Backup pair
    let primary = Arc::new(MemoryMap::<String, String>::new());
    let backup = Arc::new(MemoryMap::<String, String>::new());
    let users = BackupMap::<String, String, _>::new(primary.clone(), backup.clone(), &config);
    users.try_add(&"u1".into(), &"v1".into(), false, &cancel).await?;
    primary.clear();
    info!(
        on_primary = primary.len(),
        on_backup = backup.len(),
        "Primary lost its data"
    );
    let report = users.strategy().synchronize().await;
    info!(outcome = %report.outcome, copied = report.copied, "Backup pair repaired");

    // Cache pair
    let source = Arc::new(MemoryMap::<String, u64>::new());
    let cache = Arc::new(MemoryMap::<String, CacheEntry<u64>>::new());
    let prices = CacheMap::<String, u64, _, _>::new(source.clone(), cache.clone(), &config);
    prices.try_add(&"sku-1".into(), &1299, false, &cancel).await?;
    let hit = prices.get_or_default(&"sku-1".into(), &cancel).await?;
    info!(?hit, cached = cache.len(), "Read through cache");

    tokio::time::sleep(Duration::from_millis(250)).await;
    let refetched = prices.get_or_default(&"sku-1".into(), &cancel).await?;
    info!(?refetched, "Read after expiration");

    // Replication pair
    let master = Arc::new(MemoryQueue::<String>::new());
    let slave = Arc::new(MemoryQueue::<String>::new());
    let jobs = FallbackBlockingQueue::<String, _>::new(master.clone(), slave.clone(), &config);
    let shutdown = CancellationSource::new();
    let replication = jobs.start_replication(shutdown.token());

    for job in ["resize", "encode", "publish"] {
        jobs.enqueue(&job.to_string(), &cancel).await?;
    }
    tokio::time::sleep(Duration::from_millis(60)).await;
    info!(master = master.len(), slave = slave.len(), "Slave warmed");

    let first = jobs.dequeue(&cancel).await?;
    info!(%first, remaining = jobs.length(&cancel).await?, "Dequeued from master");

    let waiting = CancellationToken::after(Duration::from_millis(20));
    let empty = MemoryQueue::<String>::new();
    if let Err(e) = empty.dequeue(&waiting).await {
        info!(error = %e, "Blocking dequeue gave up");
    }

    shutdown.cancel();
    let _ = replication.await;

    for (key, _unit, _description, value) in snapshotter.snapshot().into_vec() {
        println!("{} {:?} = {:?}", key.key().name(), key.key().labels().collect::<Vec<_>>(), value);
    }

    Ok(())
}
