mod availability;
mod conflict;
mod error;
mod mutations;
mod queries;
mod store;
#[cfg(test)]
mod tests;

pub use availability::{day_level, hourly_slots, weekly_days};
pub(crate) use conflict::now;
pub use error::{EngineError, ErrorKind};
pub use store::InMemoryStore;

use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::{mpsc, oneshot, RwLock};
use ulid::Ulid;

use crate::model::*;
use crate::notify::NotifyHub;
use crate::observability::{WAL_FLUSH_BATCH_SIZE, WAL_FLUSH_DURATION_SECONDS};
use crate::venue::VenueDirectory;
use crate::wal::Wal;

pub type SharedVenueState = Arc<RwLock<VenueState>>;

// ── Group-commit WAL writer ──────────────────────────────

/// Upper bound on appends sharing one fsync.
const MAX_BATCH: usize = 1024;

const WAL_QUEUE_DEPTH: usize = 4096;

pub(super) type Reply = oneshot::Sender<io::Result<()>>;

pub(super) enum WalCommand {
    Append { event: Event, reply: Reply },
    Compact { events: Vec<Event>, reply: Reply },
    AppendsSinceCompact { reply: oneshot::Sender<u64> },
    #[cfg(test)]
    FailAppends { count: u32, reply: oneshot::Sender<()> },
}

/// Owns the WAL file. Every append queued while the previous fsync ran is
/// committed with the next single fsync. Control commands see all appends
/// queued before them already on disk.
async fn wal_writer_loop(mut wal: Wal, mut rx: mpsc::Receiver<WalCommand>) {
    let mut batch: Vec<(Event, Reply)> = Vec::new();
    while let Some(first) = rx.recv().await {
        let mut next = Some(first);
        while let Some(cmd) = next {
            match cmd {
                WalCommand::Append { event, reply } => {
                    batch.push((event, reply));
                    if batch.len() >= MAX_BATCH {
                        commit(&mut wal, &mut batch);
                    }
                }
                WalCommand::Compact { events, reply } => {
                    commit(&mut wal, &mut batch);
                    let result = Wal::write_compact_file(wal.path(), &events)
                        .and_then(|()| wal.swap_compact_file());
                    let _ = reply.send(result);
                }
                WalCommand::AppendsSinceCompact { reply } => {
                    commit(&mut wal, &mut batch);
                    let _ = reply.send(wal.appends_since_compact());
                }
                #[cfg(test)]
                WalCommand::FailAppends { count, reply } => {
                    commit(&mut wal, &mut batch);
                    wal.failing_appends = count;
                    let _ = reply.send(());
                }
            }
            next = rx.try_recv().ok();
        }
        commit(&mut wal, &mut batch);
    }
}

/// Buffer, fsync once, answer every caller in the batch.
fn commit(wal: &mut Wal, batch: &mut Vec<(Event, Reply)>) {
    if batch.is_empty() {
        return;
    }
    metrics::histogram!(WAL_FLUSH_BATCH_SIZE).record(batch.len() as f64);
    let started = Instant::now();

    let written = batch
        .iter()
        .try_for_each(|(event, _)| wal.append_buffered(event));
    // Flush even after an append error so the partial frame does not
    // bleed into the next batch.
    let outcome = written.and(wal.flush_sync());

    metrics::histogram!(WAL_FLUSH_DURATION_SECONDS).record(started.elapsed().as_secs_f64());
    if let Err(e) = &outcome {
        tracing::error!("WAL commit of {} events failed: {e}", batch.len());
    }
    for (_, reply) in batch.drain(..) {
        let _ = reply.send(match &outcome {
            Ok(()) => Ok(()),
            Err(e) => Err(io::Error::new(e.kind(), e.to_string())),
        });
    }
}

/// The booking engine: reservation store, lifecycle and availability.
///
/// Every mutation of a venue's reservations happens under that venue's write
/// lock, so the overlap check and the insert form one atomic step.
pub struct Engine {
    pub(super) store: InMemoryStore,
    pub(super) wal_tx: mpsc::Sender<WalCommand>,
    pub notify: Arc<NotifyHub>,
    pub(super) directory: Arc<dyn VenueDirectory>,
    /// Mutations hold this shared; compaction holds it exclusively so no
    /// append can slip between the snapshot and the file swap.
    /// Always acquired before any venue lock.
    pub(super) commit_gate: RwLock<()>,
}

impl Engine {
    /// Replay the WAL at `wal_path` into memory, then start its writer task.
    /// Must be called inside a Tokio runtime.
    pub fn new(
        wal_path: PathBuf,
        directory: Arc<dyn VenueDirectory>,
        notify: Arc<NotifyHub>,
    ) -> io::Result<Self> {
        let history = Wal::replay(&wal_path)?;
        let store = InMemoryStore::new();
        for event in &history {
            let vs = store.get_or_create_venue(event.venue_id());
            // Nothing else can see the store yet, so the lock is always free.
            if let Ok(mut guard) = vs.try_write() {
                store.apply_event(&mut guard, event);
            }
        }
        if !history.is_empty() {
            tracing::info!(
                "restored {} events for {} venues from {}",
                history.len(),
                store.venue_count(),
                wal_path.display()
            );
        }

        let (wal_tx, wal_rx) = mpsc::channel(WAL_QUEUE_DEPTH);
        tokio::spawn(wal_writer_loop(Wal::open(&wal_path)?, wal_rx));

        Ok(Self {
            store,
            wal_tx,
            notify,
            directory,
            commit_gate: RwLock::new(()),
        })
    }

    /// Send a command to the writer task and wait for its answer.
    pub(super) async fn wal_request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> WalCommand,
    ) -> Result<T, EngineError> {
        let (tx, rx) = oneshot::channel();
        self.wal_tx
            .send(build(tx))
            .await
            .map_err(|_| EngineError::WalError("WAL writer shut down".into()))?;
        rx.await
            .map_err(|_| EngineError::WalError("WAL writer dropped reply".into()))
    }

    /// Make the next `count` WAL appends fail as if the disk rejected them.
    #[cfg(test)]
    pub(crate) async fn fail_next_wal_appends(&self, count: u32) {
        self.wal_request(|reply| WalCommand::FailAppends { count, reply })
            .await
            .unwrap();
    }

    /// Durably append one event; returns once its batch is fsynced.
    async fn wal_append(&self, event: &Event) -> Result<(), EngineError> {
        let event = event.clone();
        self.wal_request(|reply| WalCommand::Append { event, reply })
            .await?
            .map_err(|e| EngineError::WalError(e.to_string()))
    }

    pub fn venue_state(&self, venue_id: &Ulid) -> Option<SharedVenueState> {
        self.store.get_venue(venue_id)
    }

    pub fn venue_for_reservation(&self, reservation_id: &Ulid) -> Option<Ulid> {
        self.store.venue_for_reservation(reservation_id)
    }

    /// Persist, apply to `vs`, then publish. The caller holds `vs`'s write lock.
    pub(super) async fn persist_and_apply(
        &self,
        vs: &mut VenueState,
        event: &Event,
    ) -> Result<(), EngineError> {
        self.wal_append(event).await?;
        self.store.apply_event(vs, event);
        self.notify.send(event.venue_id(), event);
        Ok(())
    }

    /// Lookup reservation → venue, acquire that venue's write lock.
    pub(super) async fn resolve_reservation_write(
        &self,
        reservation_id: &Ulid,
    ) -> Result<(Ulid, tokio::sync::OwnedRwLockWriteGuard<VenueState>), EngineError> {
        let venue_id = self
            .store
            .venue_for_reservation(reservation_id)
            .ok_or(EngineError::NotFound(*reservation_id))?;
        let vs = self
            .store
            .get_venue(&venue_id)
            .ok_or(EngineError::NotFound(*reservation_id))?;
        let guard = vs.write_owned().await;
        Ok((venue_id, guard))
    }
}
