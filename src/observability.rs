use std::net::SocketAddr;

// ── Request-driven counters ─────────────────────────────────────

/// Counter: reservations created through manual entry.
pub const RESERVATIONS_CREATED_TOTAL: &str = "staysync_reservations_created_total";

/// Counter: reservations written from external feed events.
pub const RESERVATIONS_IMPORTED_TOTAL: &str = "staysync_reservations_imported_total";

/// Counter: availability checks that found at least one collision.
pub const CONFLICTS_DETECTED_TOTAL: &str = "staysync_conflicts_detected_total";

// ── Feed pipeline ───────────────────────────────────────────────

/// Counter: normalized events produced across all feeds.
pub const FEED_EVENTS_TOTAL: &str = "staysync_feed_events_total";

/// Counter: feeds skipped on fetch or parse failure.
pub const FEED_FAILURES_TOTAL: &str = "staysync_feed_failures_total";

// ── Background work ─────────────────────────────────────────────

/// Counter: cleaning tasks created by the synchronizer.
pub const CLEANING_TASKS_CREATED_TOTAL: &str = "staysync_cleaning_tasks_created_total";

/// Counter: reservations transitioned confirmed → completed by the sweep.
pub const SWEEP_COMPLETED_TOTAL: &str = "staysync_sweep_completed_total";

/// Counter: admin notification rows written.
pub const NOTIFICATIONS_TOTAL: &str = "staysync_notifications_total";

/// Install Prometheus metrics exporter on the given port. No-op if port is None.
pub fn init(port: Option<u16>) {
    let Some(port) = port else { return };
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .expect("failed to install Prometheus metrics exporter");
    tracing::info!("metrics endpoint: http://0.0.0.0:{port}/metrics");
}
