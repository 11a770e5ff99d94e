use std::net::SocketAddr;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

// ── Booking lifecycle ───────────────────────────────────────────

/// Counter: reservations created (PENDING).
pub const BOOKINGS_CREATED_TOTAL: &str = "pitchtime_bookings_created_total";

/// Counter: status transitions applied. Labels: to.
pub const BOOKING_TRANSITIONS_TOTAL: &str = "pitchtime_booking_transitions_total";

/// Counter: create requests rejected because the slot was taken.
pub const BOOKING_CONFLICTS_TOTAL: &str = "pitchtime_booking_conflicts_total";

/// Counter: PENDING reservations expired by the sweeper.
pub const HOLDS_EXPIRED_TOTAL: &str = "pitchtime_holds_expired_total";

// ── Background work ─────────────────────────────────────────────

/// Histogram: time spent in one sweep, in seconds.
pub const SWEEP_DURATION_SECONDS: &str = "pitchtime_sweep_duration_seconds";

/// Counter: sweep items left for the next sweep after exhausting retries.
pub const SWEEP_FAILURES_TOTAL: &str = "pitchtime_sweep_failures_total";

/// Counter: WAL compactions performed.
pub const WAL_COMPACTIONS_TOTAL: &str = "pitchtime_wal_compactions_total";

/// Histogram: WAL group-commit flush duration in seconds.
pub const WAL_FLUSH_DURATION_SECONDS: &str = "pitchtime_wal_flush_duration_seconds";

/// Histogram: WAL group-commit batch size (events per flush).
pub const WAL_FLUSH_BATCH_SIZE: &str = "pitchtime_wal_flush_batch_size";

/// Install the Prometheus exporter on the given port. No-op if port is None.
pub fn init(port: Option<u16>) -> Result<(), BuildError> {
    let Some(port) = port else { return Ok(()) };
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!("metrics endpoint: http://0.0.0.0:{port}/metrics");
    Ok(())
}

/// Install the fmt subscriber. Safe to call more than once.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().try_init();
}
