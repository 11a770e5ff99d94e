use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};
use ulid::Ulid;

use crate::engine::{now, Engine, EngineError};
use crate::limits::{EXPIRE_RETRY_ATTEMPTS, EXPIRE_RETRY_BASE_MS};
use crate::model::Ts;
use crate::observability::{SWEEP_DURATION_SECONDS, SWEEP_FAILURES_TOTAL};

/// How often the compactor checks the WAL append counter.
const COMPACT_CHECK_INTERVAL: Duration = Duration::from_secs(30);

/// Outcome of one sweep.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepReport {
    pub expired: usize,
    pub completed: usize,
    /// Left for the next sweep.
    pub failed: usize,
}

/// Background task that expires lapsed holds and completes finished bookings.
pub async fn run_reaper(engine: Arc<Engine>, every: Duration) {
    let mut interval = tokio::time::interval(every);
    loop {
        interval.tick().await;
        let report = sweep_once(&engine, now()).await;
        if report != SweepReport::default() {
            info!(
                "sweep: {} expired, {} completed, {} deferred",
                report.expired, report.completed, report.failed
            );
        }
        engine.notify.prune();
    }
}

/// One pass over every venue as of `now`.
pub async fn sweep_once(engine: &Engine, now: Ts) -> SweepReport {
    let started = Instant::now();
    let mut report = SweepReport::default();

    for (id, _venue_id) in engine.collect_expired_holds(now) {
        match expire_with_retry(engine, id).await {
            Ok(true) => report.expired += 1,
            Ok(false) => {}
            Err(e) => {
                warn!("could not expire booking {id}, retrying next sweep: {e}");
                report.failed += 1;
            }
        }
    }

    for (id, _venue_id) in engine.collect_finished(now) {
        match engine.complete_booking(id).await {
            Ok(Some(_)) => report.completed += 1,
            Ok(None) => {}
            Err(e) => {
                warn!("could not complete booking {id}: {e}");
                report.failed += 1;
            }
        }
    }

    if report.failed > 0 {
        metrics::counter!(SWEEP_FAILURES_TOTAL).increment(report.failed as u64);
    }
    metrics::histogram!(SWEEP_DURATION_SECONDS).record(started.elapsed().as_secs_f64());
    report
}

/// `Ok(false)` when a confirm or cancel won the race.
async fn expire_with_retry(engine: &Engine, id: Ulid) -> Result<bool, EngineError> {
    let mut attempt = 0;
    loop {
        match engine.expire_booking(id).await {
            Ok(expired) => return Ok(expired.is_some()),
            Err(EngineError::NotFound(_)) => {
                debug!("reaper skip {id}: gone");
                return Ok(false);
            }
            Err(e @ EngineError::WalError(_)) => {
                attempt += 1;
                if attempt >= EXPIRE_RETRY_ATTEMPTS {
                    return Err(e);
                }
                let delay = backoff_delay(attempt);
                debug!("expire {id} failed (attempt {attempt}), backing off {delay:?}: {e}");
                tokio::time::sleep(delay).await;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Wait after the `attempt`-th failure (1-based): the base delay, doubling.
fn backoff_delay(attempt: u32) -> Duration {
    Duration::from_millis(EXPIRE_RETRY_BASE_MS << attempt.saturating_sub(1))
}

/// Background task that compacts the WAL once enough appends pile up.
pub async fn run_compactor(engine: Arc<Engine>, threshold: u64) {
    let mut interval = tokio::time::interval(COMPACT_CHECK_INTERVAL);
    loop {
        interval.tick().await;
        if let Err(e) = compact_if_needed(&engine, threshold).await {
            warn!("WAL compaction failed: {e}");
        }
    }
}

/// Compact when at least `threshold` appends happened since the last one.
pub async fn compact_if_needed(engine: &Engine, threshold: u64) -> Result<bool, EngineError> {
    let appends = engine.wal_appends_since_compact().await;
    if appends < threshold {
        return Ok(false);
    }
    debug!("{appends} WAL appends since last compaction, compacting");
    engine.compact_wal().await?;
    Ok(true)
}
