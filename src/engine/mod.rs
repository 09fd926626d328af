mod error;
mod inventory;
mod queries;
mod reservations;
mod retry;
mod store;
mod validate;

pub use error::{EngineError, ErrorKind};
pub use retry::RetryPolicy;
pub use store::{InventoryStore, SharedHotelState, normalize_name};

use std::io;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use tokio::sync::mpsc::error::SendTimeoutError;
use tokio::sync::{Mutex, OwnedRwLockReadGuard, OwnedRwLockWriteGuard, mpsc, oneshot};
use tracing::{error, info, warn};
use ulid::Ulid;

use crate::model::*;
use crate::observability;
use crate::wal::Wal;

// ── Group-commit WAL channel ─────────────────────────────

pub(super) enum WalCommand {
    Append {
        event: Event,
        response: oneshot::Sender<io::Result<()>>,
    },
    Compact {
        events: Vec<Event>,
        response: oneshot::Sender<io::Result<()>>,
    },
    AppendsSinceCompact {
        response: oneshot::Sender<u64>,
    },
    #[cfg(test)]
    InjectFault {
        fault: crate::wal::Fault,
        response: oneshot::Sender<()>,
    },
}

type PendingAppend = (Event, oneshot::Sender<io::Result<()>>);

/// Background task that owns the WAL and batches appends for group commit.
/// 1. Block until the first Append arrives.
/// 2. Buffer it (no fsync).
/// 3. Drain all immediately available Appends.
/// 4. One flush_sync for the whole batch.
/// 5. Answer every sender with the batch result.
async fn wal_writer_loop(mut wal: Wal, mut rx: mpsc::Receiver<WalCommand>) {
    while let Some(cmd) = rx.recv().await {
        match cmd {
            WalCommand::Append { event, response } => {
                let mut batch = vec![(event, response)];
                let mut deferred = None;
                loop {
                    match rx.try_recv() {
                        Ok(WalCommand::Append { event, response }) => batch.push((event, response)),
                        Ok(other) => {
                            // Non-append commands run after the batch they interrupted.
                            deferred = Some(other);
                            break;
                        }
                        Err(_) => break,
                    }
                }
                commit_batch(&mut wal, &mut batch);
                if let Some(other) = deferred {
                    handle_non_append(&mut wal, other);
                }
            }
            other => handle_non_append(&mut wal, other),
        }
    }
    info!("WAL writer stopped");
}

fn commit_batch(wal: &mut Wal, batch: &mut Vec<PendingAppend>) {
    metrics::histogram!(observability::WAL_FLUSH_BATCH_SIZE).record(batch.len() as f64);
    let flush_start = Instant::now();
    let result = flush_batch(wal, batch);
    metrics::histogram!(observability::WAL_FLUSH_DURATION_SECONDS)
        .record(flush_start.elapsed().as_secs_f64());
    if let Err(e) = &result {
        error!(error = %e, events = batch.len(), "WAL batch commit failed");
        if wal.is_poisoned() {
            error!("WAL rollback failed; appends are refused until the next compaction");
        }
    }
    for (_, tx) in batch.drain(..) {
        let r = match &result {
            Ok(()) => Ok(()),
            Err(e) => Err(io::Error::new(e.kind(), e.to_string())),
        };
        let _ = tx.send(r);
    }
}

/// All or nothing: every caller in the batch gets the same verdict, so a batch
/// that cannot be staged whole is dropped before anything is written.
fn flush_batch(wal: &mut Wal, batch: &[PendingAppend]) -> io::Result<()> {
    for (event, _) in batch {
        if let Err(e) = wal.append_buffered(event) {
            wal.discard_pending();
            return Err(e);
        }
    }
    wal.flush_sync()
}

fn handle_non_append(wal: &mut Wal, cmd: WalCommand) {
    match cmd {
        WalCommand::Compact { events, response } => {
            let result = Wal::write_compact_file(wal.path(), &events)
                .and_then(|()| wal.swap_compact_file());
            let _ = response.send(result);
        }
        WalCommand::AppendsSinceCompact { response } => {
            let _ = response.send(wal.appends_since_compact());
        }
        #[cfg(test)]
        WalCommand::InjectFault { fault, response } => {
            wal.inject_fault(fault);
            let _ = response.send(());
        }
        WalCommand::Append { event, response } => {
            let mut batch = vec![(event, response)];
            commit_batch(wal, &mut batch);
        }
    }
}

// ── Engine ───────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct EngineSettings {
    /// Longest a caller waits for a hotel lock.
    pub lock_wait: Duration,
    /// Longest a caller waits to enqueue a WAL append.
    pub commit_timeout: Duration,
    pub read_retry: RetryPolicy,
    pub event_types: Vec<EventType>,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            lock_wait: Duration::from_millis(2000),
            commit_timeout: Duration::from_millis(5000),
            read_retry: RetryPolicy::default(),
            event_types: default_event_types(),
        }
    }
}

pub fn default_event_types() -> Vec<EventType> {
    [(1, "Wedding"), (2, "Conference"), (3, "Birthday Party"), (4, "Seminar")]
        .into_iter()
        .map(|(id, name)| EventType { id, name: name.into() })
        .collect()
}

pub struct Engine {
    pub(super) store: InventoryStore,
    pub(super) wal_tx: mpsc::Sender<WalCommand>,
    /// Serializes the unique-name check with the hotel insert.
    pub(super) registration: Mutex<()>,
    pub(super) settings: EngineSettings,
}

impl Engine {
    pub fn new(wal_path: PathBuf, mut settings: EngineSettings) -> io::Result<Self> {
        let replay = Wal::replay(&wal_path)?;
        let mut wal = Wal::open(&wal_path)?;
        if replay.discarded_bytes > 0 {
            warn!(
                path = %wal_path.display(),
                offset = replay.valid_len,
                discarded = replay.discarded_bytes,
                "dropping torn WAL tail"
            );
            wal.truncate_tail(replay.valid_len)?;
        }
        wal.seed_appends_since_compact(replay.events.len() as u64);
        let (wal_tx, wal_rx) = mpsc::channel(4096);
        tokio::spawn(wal_writer_loop(wal, wal_rx));

        settings.event_types.sort_by_key(|t| t.id);
        settings.event_types.dedup_by_key(|t| t.id);

        let engine = Self {
            store: InventoryStore::new(),
            wal_tx,
            registration: Mutex::new(()),
            settings,
        };

        // Sole owner of every Arc here, so try_write never contends. Never use
        // blocking_write: this runs inside the runtime.
        for event in &replay.events {
            engine.replay_event(event)?;
        }
        info!(
            path = %wal_path.display(),
            events = replay.events.len(),
            hotels = engine.store.hotel_count(),
            "WAL replayed"
        );
        Ok(engine)
    }

    fn replay_event(&self, event: &Event) -> io::Result<()> {
        if let Event::HotelRegistered { hotel } = event {
            if self.store.insert_hotel(hotel.clone()).is_none() {
                warn!(hotel_id = %hotel.id, name = %hotel.name, "replay: duplicate hotel name skipped");
            }
            return Ok(());
        }
        let hotel_id = event.hotel_id();
        let Some(hs) = self.store.get_hotel(&hotel_id) else {
            warn!(%hotel_id, "replay: event for unknown hotel skipped");
            return Ok(());
        };
        let mut guard = hs
            .try_write()
            .map_err(|_| io::Error::other("replay: hotel state unexpectedly locked"))?;
        self.store.apply_event(&mut guard, event);
        Ok(())
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub fn hotel_count(&self) -> usize {
        self.store.hotel_count()
    }

    /// Write event to the WAL via the group-commit writer and wait for fsync.
    pub(super) async fn wal_append(&self, event: &Event) -> Result<(), EngineError> {
        let (tx, rx) = oneshot::channel();
        let cmd = WalCommand::Append {
            event: event.clone(),
            response: tx,
        };
        match self.wal_tx.send_timeout(cmd, self.settings.commit_timeout).await {
            Ok(()) => {}
            Err(SendTimeoutError::Timeout(_)) => {
                error!("WAL commit queue full");
                return Err(EngineError::Storage("WAL writer stalled".into()));
            }
            Err(SendTimeoutError::Closed(_)) => {
                return Err(EngineError::Storage("WAL writer shut down".into()));
            }
        }
        // Once enqueued the record may land, so always wait for the verdict.
        rx.await
            .map_err(|_| EngineError::Storage("WAL writer dropped response".into()))?
            .map_err(|e| EngineError::Storage(e.to_string()))
    }

    /// WAL append then in-memory apply. Nothing is applied if the append fails.
    pub(super) async fn persist_and_apply(
        &self,
        hs: &mut HotelState,
        event: &Event,
    ) -> Result<(), EngineError> {
        self.wal_append(event).await?;
        self.store.apply_event(hs, event);
        Ok(())
    }

    fn hotel_handle(&self, hotel_id: &Ulid) -> Result<SharedHotelState, EngineError> {
        self.store
            .get_hotel(hotel_id)
            .ok_or_else(|| EngineError::not_found("hotel", hotel_id))
    }

    pub(super) async fn lock_hotel_write(
        &self,
        hotel_id: Ulid,
    ) -> Result<OwnedRwLockWriteGuard<HotelState>, EngineError> {
        let hs = self.hotel_handle(&hotel_id)?;
        match tokio::time::timeout(self.settings.lock_wait, hs.write_owned()).await {
            Ok(guard) => Ok(guard),
            Err(_) => {
                metrics::counter!(observability::LOCK_TIMEOUTS_TOTAL, "mode" => "write").increment(1);
                warn!(%hotel_id, wait = ?self.settings.lock_wait, "hotel write lock timed out");
                Err(EngineError::Conflict(format!(
                    "hotel {hotel_id} is busy, lock wait exceeded"
                )))
            }
        }
    }

    pub(super) async fn lock_hotel_read(
        &self,
        hs: SharedHotelState,
    ) -> Result<OwnedRwLockReadGuard<HotelState>, EngineError> {
        match tokio::time::timeout(self.settings.lock_wait, hs.read_owned()).await {
            Ok(guard) => Ok(guard),
            Err(_) => {
                metrics::counter!(observability::LOCK_TIMEOUTS_TOTAL, "mode" => "read").increment(1);
                warn!(wait = ?self.settings.lock_wait, "hotel read lock timed out");
                Err(EngineError::Storage("read lock wait exceeded".into()))
            }
        }
    }

    /// Lookup reservation → hotel, acquire the hotel's write lock.
    pub(super) async fn resolve_reservation_write(
        &self,
        reservation_id: Ulid,
    ) -> Result<OwnedRwLockWriteGuard<HotelState>, EngineError> {
        let hotel_id = self
            .store
            .hotel_for_reservation(&reservation_id)
            .ok_or_else(|| EngineError::not_found("reservation", reservation_id))?;
        self.lock_hotel_write(hotel_id).await
    }

    // ── Maintenance ──────────────────────────────────────

    /// Rewrite the WAL as a minimal snapshot of current state.
    ///
    /// Registration and every hotel are locked until the new file is in place,
    /// so no append can land in the old log after the snapshot was taken.
    pub async fn compact_wal(&self) -> Result<(), EngineError> {
        let _registration = self.registration.lock().await;
        let mut guards = Vec::new();
        for (_, hs) in self.store.hotel_handles() {
            guards.push(hs.read_owned().await);
        }

        let mut events = Vec::new();
        for hs in &guards {
            events.push(Event::HotelRegistered {
                hotel: hs.hotel.clone(),
            });
            if hs.has_rooms_assigned() {
                events.push(Event::CapacitySet {
                    hotel_id: hs.hotel.id,
                    rows: hs.rooms.values().copied().collect(),
                });
            }
            let mut reservations: Vec<_> = hs.reservations.values().collect();
            reservations.sort_by_key(|r| r.id);
            events.extend(reservations.into_iter().map(|r| Event::ReservationRestored {
                reservation: r.clone(),
            }));
        }

        let count = events.len();
        let (tx, rx) = oneshot::channel();
        self.wal_tx
            .send(WalCommand::Compact { events, response: tx })
            .await
            .map_err(|_| EngineError::Storage("WAL writer shut down".into()))?;
        rx.await
            .map_err(|_| EngineError::Storage("WAL writer dropped response".into()))?
            .map_err(|e| {
                error!(error = %e, "WAL compaction failed");
                EngineError::Storage(e.to_string())
            })?;
        info!(events = count, hotels = guards.len(), "WAL compacted");
        Ok(())
    }

    #[cfg(test)]
    pub(super) async fn inject_wal_fault(&self, fault: crate::wal::Fault) {
        let (tx, rx) = oneshot::channel();
        if self
            .wal_tx
            .send(WalCommand::InjectFault { fault, response: tx })
            .await
            .is_ok()
        {
            let _ = rx.await;
        }
    }

    pub async fn wal_appends_since_compact(&self) -> u64 {
        let (tx, rx) = oneshot::channel();
        if self
            .wal_tx
            .send(WalCommand::AppendsSinceCompact { response: tx })
            .await
            .is_err()
        {
            return 0;
        }
        rx.await.unwrap_or(0)
    }
}
