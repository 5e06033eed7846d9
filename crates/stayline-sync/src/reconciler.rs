//! # Persistence Reconciler
//!
//! Sends locally applied changes to the backend and folds the answer back
//! into the store.
//!
//! ## Processing Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Reconciler Flow                                      │
//! │                                                                         │
//! │  DeskHandle::execute ──submit(PendingPersist)──► jobs (FIFO)           │
//! │                                                     │                   │
//! │                                                     ▼                   │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │  attempt ── timeout(persist_timeout, backend.persist(op))       │   │
//! │  │     │                                                           │   │
//! │  │     ├── Ok(saved)        → save guest profile → Saved           │   │
//! │  │     ├── Rejected         → fetch server copies → Rejected       │   │
//! │  │     ├── retryable error  → sleep(backoff) → attempt again       │   │
//! │  │     │                      (up to max_retries)                  │   │
//! │  │     └── anything else    → Failed                               │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                                     │                   │
//! │                                                     ▼                   │
//! │  stayline_core::reconcile(store, pending, outcome) → DeskEvent         │
//! │                                                                         │
//! │  Failed never rolls back: the local change stays and is marked         │
//! │  unsynced until a later persist of the booking succeeds.               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Jobs run one at a time so a create is always confirmed before the
//! updates that follow it.

use std::sync::Arc;

use backoff::backoff::Backoff;
use backoff::ExponentialBackoff;
use stayline_core::{reconcile, Booking, BookingStore, PendingPersist, PersistOp, PersistOutcome, Reconciliation};
use tokio::sync::{mpsc, Mutex};
use tokio::time::{sleep, timeout};
use tracing::{debug, error, info, warn};

use crate::backend::PersistBackend;
use crate::config::PersistenceSettings;
use crate::error::{SyncError, SyncResult};
use crate::event::DeskEvent;

const JOB_QUEUE_SIZE: usize = 100;

// =============================================================================
// Handle
// =============================================================================

/// Handle for feeding the reconciler.
#[derive(Clone)]
pub struct ReconcilerHandle {
    jobs_tx: mpsc::Sender<PendingPersist>,
    shutdown_tx: mpsc::Sender<()>,
}

impl ReconcilerHandle {
    /// Queues a persist. Returns once queued, not once saved.
    pub async fn submit(&self, pending: PendingPersist) -> SyncResult<()> {
        self.jobs_tx
            .send(pending)
            .await
            .map_err(|_| SyncError::ShuttingDown)
    }

    /// Stops after the job in flight; queued jobs are dropped and their
    /// bookings stay unsynced.
    pub async fn shutdown(&self) -> SyncResult<()> {
        self.shutdown_tx
            .send(())
            .await
            .map_err(|_| SyncError::ChannelError("Shutdown channel closed".into()))
    }
}

// =============================================================================
// Reconciler
// =============================================================================

pub struct Reconciler {
    settings: PersistenceSettings,
    backend: Arc<dyn PersistBackend>,
    store: Arc<Mutex<BookingStore>>,
    events: mpsc::Sender<DeskEvent>,
    jobs_rx: mpsc::Receiver<PendingPersist>,
    shutdown_rx: mpsc::Receiver<()>,
}

impl Reconciler {
    /// Spawns the reconciler task and returns its handle.
    pub fn spawn(
        settings: PersistenceSettings,
        backend: Arc<dyn PersistBackend>,
        store: Arc<Mutex<BookingStore>>,
        events: mpsc::Sender<DeskEvent>,
    ) -> ReconcilerHandle {
        let (jobs_tx, jobs_rx) = mpsc::channel(JOB_QUEUE_SIZE);
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);

        let reconciler = Reconciler {
            settings,
            backend,
            store,
            events,
            jobs_rx,
            shutdown_rx,
        };
        tokio::spawn(reconciler.run());

        ReconcilerHandle { jobs_tx, shutdown_tx }
    }

    async fn run(mut self) {
        info!(
            timeout_ms = self.settings.timeout_ms,
            max_retries = self.settings.max_retries,
            "Reconciler starting"
        );

        loop {
            tokio::select! {
                Some(pending) = self.jobs_rx.recv() => {
                    self.process(pending).await;
                }
                _ = self.shutdown_rx.recv() => {
                    info!("Reconciler received shutdown");
                    break;
                }
                else => break,
            }
        }

        info!("Reconciler stopped");
    }

    async fn process(&self, pending: PendingPersist) {
        debug!(op = op_name(&pending.op), bookings = ?pending.booking_ids, "Persisting");

        let outcome = match self.persist_with_retry(&pending.op).await {
            Ok(saved) => {
                if let Some(profile) = &pending.guest_profile {
                    // The booking is saved either way; a missing profile only
                    // costs the next lookup.
                    if let Err(e) = self.backend.save_guest(profile).await {
                        warn!(phone = %profile.phone_number, error = %e, "Guest profile not saved");
                    }
                }
                PersistOutcome::Saved(saved)
            }
            Err(SyncError::Rejected { code, message }) => {
                warn!(code = %code, bookings = ?pending.booking_ids, "Persist rejected by server");
                match self.backend.fetch_bookings(&pending.booking_ids).await {
                    Ok(server_copies) => PersistOutcome::Rejected {
                        code,
                        message,
                        server_copies,
                    },
                    Err(e) => PersistOutcome::Failed {
                        reason: format!("{message} (refresh failed: {e})"),
                    },
                }
            }
            Err(e) => {
                error!(bookings = ?pending.booking_ids, error = %e, "Persist failed, keeping local change");
                PersistOutcome::Failed { reason: e.to_string() }
            }
        };

        let reconciliation = {
            let mut store = self.store.lock().await;
            let outcome = carry_channel_status(&store, outcome);
            reconcile(&mut store, &pending, outcome)
        };

        let event = match reconciliation {
            Reconciliation::Synced { booking_ids } => DeskEvent::Persisted { booking_ids },
            Reconciliation::Refreshed { code, message } => DeskEvent::Refreshed {
                booking_ids: pending.booking_ids.clone(),
                code,
                message,
            },
            Reconciliation::KeptLocal { booking_ids, reason } => DeskEvent::PersistFailure { booking_ids, reason },
        };
        if self.events.send(event).await.is_err() {
            debug!("No one is listening for desk events");
        }
    }

    /// One persist with timeout, retrying retryable failures with
    /// exponential backoff.
    async fn persist_with_retry(&self, op: &PersistOp) -> SyncResult<Vec<Booking>> {
        let mut backoff = self.create_backoff();
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            let result = match timeout(self.settings.timeout(), self.backend.persist(op)).await {
                Ok(result) => result,
                Err(_) => Err(SyncError::Timeout(self.settings.timeout_ms)),
            };

            match result {
                Ok(saved) => {
                    if attempt > 1 {
                        info!(attempt, "Persist succeeded after retry");
                    }
                    return Ok(saved);
                }
                Err(e) if e.is_retryable() && attempt <= self.settings.max_retries => {
                    let delay = backoff.next_backoff().unwrap_or_else(|| self.settings.max_backoff());
                    warn!(attempt, ?delay, error = %e, "Persist attempt failed, retrying");
                    sleep(delay).await;
                }
                Err(e) if e.is_retryable() => {
                    return Err(SyncError::MaxRetriesExceeded {
                        attempts: attempt,
                        last_error: e.to_string(),
                    });
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn create_backoff(&self) -> ExponentialBackoff {
        ExponentialBackoff {
            initial_interval: self.settings.initial_backoff(),
            max_interval: self.settings.max_backoff(),
            multiplier: 2.0,
            max_elapsed_time: None,
            ..Default::default()
        }
    }
}

fn op_name(op: &PersistOp) -> &'static str {
    match op {
        PersistOp::CreateBookings { .. } => "create_bookings",
        PersistOp::UpdateBooking { .. } => "update_booking",
        PersistOp::TransferBooking { .. } => "transfer_booking",
    }
}

/// Channel statuses arrive locally after the persist was sent; keep them
/// on the canonical copies that replace the local ones.
fn carry_channel_status(store: &BookingStore, outcome: PersistOutcome) -> PersistOutcome {
    let carry = |mut copies: Vec<Booking>| {
        for copy in &mut copies {
            if let Some(local) = store.booking(&copy.id) {
                for (channel, status) in &local.channel_sync {
                    copy.channel_sync.insert(channel.clone(), *status);
                }
            }
        }
        copies
    };
    match outcome {
        PersistOutcome::Saved(saved) => PersistOutcome::Saved(carry(saved)),
        PersistOutcome::Rejected {
            code,
            message,
            server_copies,
        } => PersistOutcome::Rejected {
            code,
            message,
            server_copies: carry(server_copies),
        },
        failed => failed,
    }
}
