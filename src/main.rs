use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use staysync::engine::{Engine, InMemoryStore, Snapshot};
use staysync::feed::FeedNormalizer;
use staysync::sweeper;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let metrics_port: Option<u16> = std::env::var("STAYSYNC_METRICS_PORT")
        .ok()
        .and_then(|s| s.parse().ok());
    staysync::observability::init(metrics_port);

    let sweep_interval: u64 = std::env::var("STAYSYNC_SWEEP_INTERVAL_SECS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(3600);
    let feed_interval: u64 = std::env::var("STAYSYNC_FEED_SYNC_INTERVAL_SECS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(3600);

    let store = Arc::new(InMemoryStore::new());
    if let Ok(path) = std::env::var("STAYSYNC_SNAPSHOT") {
        let raw = std::fs::read_to_string(&path)?;
        let snapshot: Snapshot = serde_json::from_str(&raw)?;
        store.load_snapshot(snapshot);
        info!("seed snapshot loaded from {path}");
    }

    let engine = Arc::new(Engine::new(store));
    let normalizer = FeedNormalizer::new()?;

    info!("staysync starting");
    info!("  sweep_interval: {sweep_interval}s");
    info!("  feed_sync_interval: {feed_interval}s");
    info!(
        "  metrics: {}",
        metrics_port.map_or("disabled".to_string(), |p| format!(
            "http://0.0.0.0:{p}/metrics"
        ))
    );

    // The first tick of each interval fires immediately, so a sweep and
    // a feed round run at startup before settling into the cadence.
    let sweep = tokio::spawn(sweeper::run_sweeper(
        engine.clone(),
        Duration::from_secs(sweep_interval),
    ));
    let feed_sync = tokio::spawn(sweeper::run_feed_sync(
        engine.clone(),
        normalizer,
        Duration::from_secs(feed_interval),
    ));

    // Run until SIGTERM/ctrl-c
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to register SIGTERM handler");
        tokio::select! {
            _ = ctrl_c => {}
            _ = sigterm.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
    }

    info!("shutdown signal received");
    sweep.abort();
    feed_sync.abort();
    info!("staysync stopped");
    Ok(())
}
