//! # Front-Desk Session
//!
//! [`DeskHandle`] owns the local booking store for one clerk session.
//!
//! ## Command Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       DeskHandle::execute                               │
//! │                                                                         │
//! │  Command ──► lock store ──► stayline_core::apply ──► unlock             │
//! │                                  │                                      │
//! │                    Err ◄─────────┤  (validation, conflict, stale,       │
//! │              nothing changed     │   checkout blocked)                  │
//! │                                  ▼                                      │
//! │                          Applied { bookings, persist }                  │
//! │                                  │                                      │
//! │              ┌───────────────────┼────────────────────┐                 │
//! │              ▼                                        ▼                 │
//! │     Reconciler.submit(persist)            ChannelNotifier.notify(id)    │
//! │     (background, FIFO)                    (inventory-changing only)     │
//! │                                                                         │
//! │  The caller gets Applied back immediately: the grid shows the change   │
//! │  before the server has confirmed it.                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;

use stayline_core::{apply, Applied, Booking, BookingStore, Clock, Command, RateUpdate, SyncEvent};
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info};

use crate::backend::PersistBackend;
use crate::config::DeskConfig;
use crate::error::SyncResult;
use crate::event::DeskEvent;
use crate::fanout::{ChannelNotifier, FailurePolicy};
use crate::reconciler::{Reconciler, ReconcilerHandle};

const EVENT_QUEUE_SIZE: usize = 256;

/// Handle to a running front-desk session. Cheap to clone.
#[derive(Clone)]
pub struct DeskHandle {
    store: Arc<Mutex<BookingStore>>,
    backend: Arc<dyn PersistBackend>,
    clock: Arc<dyn Clock>,
    reconciler: ReconcilerHandle,
    notifier: ChannelNotifier,
}

impl DeskHandle {
    /// Loads the store from `backend` and starts the background tasks.
    pub async fn start(
        config: &DeskConfig,
        backend: Arc<dyn PersistBackend>,
        clock: Arc<dyn Clock>,
    ) -> SyncResult<(DeskHandle, mpsc::Receiver<DeskEvent>)> {
        let store = backend.load_store().await?;
        info!(
            property = %config.property.id,
            bookings = store.bookings().count(),
            "Front desk session starting"
        );
        Ok(Self::with_store(config, backend, store, clock))
    }

    /// Starts the background tasks over an already loaded store.
    pub fn with_store(
        config: &DeskConfig,
        backend: Arc<dyn PersistBackend>,
        store: BookingStore,
        clock: Arc<dyn Clock>,
    ) -> (DeskHandle, mpsc::Receiver<DeskEvent>) {
        let store = Arc::new(Mutex::new(store));
        let (events_tx, events_rx) = mpsc::channel(EVENT_QUEUE_SIZE);

        let reconciler = Reconciler::spawn(
            config.persistence.clone(),
            backend.clone(),
            store.clone(),
            events_tx.clone(),
        );
        let notifier = ChannelNotifier::new(config.fanout.clone(), store.clone(), events_tx);

        let desk = DeskHandle {
            store,
            backend,
            clock,
            reconciler,
            notifier,
        };
        (desk, events_rx)
    }

    /// Replaces the channel failure policy (deterministic tests, demos).
    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.notifier = self.notifier.with_policy(policy);
        self
    }

    /// Applies `command` locally and schedules its persistence.
    ///
    /// A refused command returns the engine's error and leaves the store
    /// untouched. An accepted one is visible at once; the server's verdict
    /// arrives later as a [`DeskEvent`].
    pub async fn execute(&self, command: Command) -> SyncResult<Applied> {
        let name = command.name();
        let fan_out = changes_inventory(&command);

        let applied = {
            let mut store = self.store.lock().await;
            apply(&mut store, command, self.clock.as_ref())?
        };
        debug!(command = name, bookings = applied.bookings.len(), "Command applied locally");

        self.reconciler.submit(applied.persist.clone()).await?;

        if fan_out {
            for booking in &applied.bookings {
                self.notifier.notify(&booking.id).await;
            }
        }
        Ok(applied)
    }

    /// Records a rate change and pushes it to the channels.
    pub async fn publish_rate(&self, update: RateUpdate) -> Vec<String> {
        let id = update.id.clone();
        self.store.lock().await.upsert(SyncEvent::RateUpdate(update));
        self.notifier.notify(&id).await
    }

    /// Reloads everything from the backend. Unconfirmed local changes are
    /// discarded.
    pub async fn refresh(&self) -> SyncResult<()> {
        let fresh = self.backend.load_store().await?;
        let mut store = self.store.lock().await;
        let dropped = store.unsynced().count();
        *store = fresh;
        info!(dropped_unsynced = dropped, "Store refreshed from server");
        Ok(())
    }

    pub async fn booking(&self, id: &str) -> Option<Booking> {
        self.store.lock().await.booking(id).cloned()
    }

    /// A copy of the whole store for rendering.
    pub async fn snapshot(&self) -> BookingStore {
        self.store.lock().await.clone()
    }

    /// Ids of bookings whose latest change the server has not confirmed.
    pub async fn unsynced_ids(&self) -> Vec<String> {
        self.store.lock().await.unsynced().map(|b| b.id.clone()).collect()
    }

    pub async fn shutdown(&self) -> SyncResult<()> {
        info!("Front desk session stopping");
        self.reconciler.shutdown().await
    }
}

/// Commands that change what the channels can sell.
fn changes_inventory(command: &Command) -> bool {
    matches!(
        command,
        Command::CreateReservation(_)
            | Command::MoveBooking { .. }
            | Command::ResizeBooking { .. }
            | Command::ChangeStatus { .. }
            | Command::TransferRoom { .. }
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DeskConfig;
    use crate::error::SyncError;
    use crate::test_support::{booking, d, db_with_inventory, store, ScriptedBackend, Step};
    use stayline_core::ledger::NewCharge;
    use stayline_core::reservation::{ReservationRequest, ReservationRow};
    use stayline_core::transfer::TransferRequest;
    use stayline_core::{BookingSource, ChannelStatus, CoreError, FixedClock, FolioCategory, Money};

    fn config() -> DeskConfig {
        let mut config = DeskConfig::default();
        config.fanout.failure_rate = 0.0;
        config
    }

    fn request(name: &str, rooms: usize) -> ReservationRequest {
        ReservationRequest {
            guest_name: name.to_string(),
            phone_number: Some("9800000001".to_string()),
            email: None,
            guest_details: None,
            source: BookingSource::Mmt,
            special_requests: None,
            is_vip: false,
            rooms: (0..rooms)
                .map(|_| ReservationRow {
                    room_type_id: "rt-1".to_string(),
                    check_in: d("2024-06-01"),
                    check_out: d("2024-06-03"),
                    room_number: None,
                    pax: Some(2),
                    extra_beds: 0,
                })
                .collect(),
        }
    }

    fn clock() -> Arc<dyn Clock> {
        Arc::new(FixedClock::on(d("2024-05-20")))
    }

    async fn next_persist_event(rx: &mut mpsc::Receiver<DeskEvent>) -> DeskEvent {
        loop {
            let event = rx.recv().await.unwrap();
            if !matches!(event, DeskEvent::ChannelUpdate { .. }) {
                return event;
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_create_is_visible_before_confirmation() {
        let backend = Arc::new(ScriptedBackend::new(vec![]));
        let (desk, mut rx) = DeskHandle::with_store(&config(), backend, store(), clock());

        let applied = desk
            .execute(Command::CreateReservation(request("Asha Rao", 2)))
            .await
            .unwrap();
        assert_eq!(applied.bookings.len(), 2);
        assert_eq!(desk.unsynced_ids().await.len(), 2);

        assert!(matches!(next_persist_event(&mut rx).await, DeskEvent::Persisted { .. }));
        assert!(desk.unsynced_ids().await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_refused_command_changes_nothing() {
        let backend = Arc::new(ScriptedBackend::new(vec![]));
        let (desk, _rx) = DeskHandle::with_store(&config(), backend.clone(), store(), clock());

        // rt-1 has two rooms
        let err = desk
            .execute(Command::CreateReservation(request("Asha Rao", 3)))
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::Rule(CoreError::AvailabilityConflict { .. })));
        assert_eq!(desk.snapshot().await.bookings().count(), 0);
        assert_eq!(backend.calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_version_is_refused_locally() {
        let backend = Arc::new(ScriptedBackend::new(vec![]));
        let (desk, mut rx) = DeskHandle::with_store(&config(), backend, store(), clock());
        let applied = desk
            .execute(Command::CreateReservation(request("Asha Rao", 1)))
            .await
            .unwrap();
        next_persist_event(&mut rx).await;
        let b = &applied.bookings[0];

        let err = desk
            .execute(Command::SetVip {
                booking_id: b.id.clone(),
                expected_version: b.timestamp - 1,
                is_vip: true,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::Rule(ref e) if e.is_lock_conflict()));
        assert!(!desk.booking(&b.id).await.unwrap().is_vip);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_persist_keeps_local_booking() {
        let backend = Arc::new(ScriptedBackend::new(vec![Step::Fail(SyncError::DatabaseError(
            "disk full".into(),
        ))]));
        let (desk, mut rx) = DeskHandle::with_store(&config(), backend, store(), clock());

        let applied = desk
            .execute(Command::CreateReservation(request("Asha Rao", 1)))
            .await
            .unwrap();

        assert!(matches!(next_persist_event(&mut rx).await, DeskEvent::PersistFailure { .. }));
        let id = &applied.bookings[0].id;
        assert!(desk.booking(id).await.is_some());
        assert_eq!(desk.unsynced_ids().await, vec![id.clone()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_new_booking_fans_out_to_connected_channels() {
        let backend = Arc::new(ScriptedBackend::new(vec![]));
        let (desk, mut rx) = DeskHandle::with_store(&config(), backend, store(), clock());
        let desk = desk.with_failure_policy(FailurePolicy::Never);

        let applied = desk
            .execute(Command::CreateReservation(request("Asha Rao", 1)))
            .await
            .unwrap();
        let id = applied.bookings[0].id.clone();

        let mut mmt = None;
        while mmt.is_none() {
            if let DeskEvent::ChannelUpdate { channel, status, .. } = rx.recv().await.unwrap() {
                if channel == "MMT" {
                    mmt = Some(status);
                }
            }
        }
        assert_eq!(mmt, Some(ChannelStatus::Success));

        let sync = desk.booking(&id).await.unwrap().channel_sync;
        assert_eq!(sync.get("MMT"), Some(&ChannelStatus::Success));
        assert_eq!(sync.get("Booking.com"), Some(&ChannelStatus::Stopped));
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_edit_survives_first_confirmation() {
        let b = booking("b-1", "101", "2024-06-01", "2024-06-03");
        // The second persist stalls once, so the first answer lands while
        // it is still queued
        let backend = Arc::new(ScriptedBackend::new(vec![Step::Save, Step::Hang]).with_server_copy(b.clone()));
        let mut local = store();
        local.upsert_booking(b.clone());
        let (desk, mut rx) = DeskHandle::with_store(&config(), backend, local, clock());

        let vip = desk
            .execute(Command::SetVip {
                booking_id: "b-1".to_string(),
                expected_version: b.timestamp,
                is_vip: true,
            })
            .await
            .unwrap();
        desk.execute(Command::SetSettled {
            booking_id: "b-1".to_string(),
            expected_version: vip.bookings[0].timestamp,
            is_settled: true,
        })
        .await
        .unwrap();

        assert!(matches!(next_persist_event(&mut rx).await, DeskEvent::Persisted { .. }));
        let current = desk.booking("b-1").await.unwrap();
        assert!(current.is_vip);
        assert!(current.is_settled);
        assert_eq!(desk.unsynced_ids().await, vec!["b-1".to_string()]);

        assert!(matches!(next_persist_event(&mut rx).await, DeskEvent::Persisted { .. }));
        assert!(desk.booking("b-1").await.unwrap().is_settled);
        assert!(desk.unsynced_ids().await.is_empty());
    }

    #[tokio::test]
    async fn test_edit_after_transfer_is_accepted_by_server() {
        let db = Arc::new(db_with_inventory().await);
        let mut config = config();
        config.fanout.enabled = false;
        let (desk, mut rx) = DeskHandle::start(&config, db.clone(), clock()).await.unwrap();

        let created = desk
            .execute(Command::CreateReservation(request("Asha Rao", 1)))
            .await
            .unwrap();
        assert!(matches!(next_persist_event(&mut rx).await, DeskEvent::Persisted { .. }));
        let b = &created.bookings[0];

        let moved = desk
            .execute(Command::TransferRoom {
                booking_id: b.id.clone(),
                expected_version: b.timestamp,
                request: TransferRequest {
                    new_room_type_id: "rt-2".to_string(),
                    new_room_number: "201".to_string(),
                    effective_date: b.check_in,
                    keep_rate: false,
                    transfer_folio: false,
                },
            })
            .await
            .unwrap();
        assert!(matches!(next_persist_event(&mut rx).await, DeskEvent::Persisted { .. }));
        let server_copy = db.bookings().require(&b.id).await.unwrap();
        assert_eq!(server_copy.timestamp, moved.bookings[0].timestamp);

        desk.execute(Command::AddCharge {
            booking_id: b.id.clone(),
            expected_version: moved.bookings[0].timestamp,
            charge: NewCharge {
                category: FolioCategory::Laundry,
                description: "Laundry".to_string(),
                amount: Money::from_major(200),
                is_inclusive: false,
            },
        })
        .await
        .unwrap();
        assert!(matches!(next_persist_event(&mut rx).await, DeskEvent::Persisted { .. }));

        let saved = db.bookings().require(&b.id).await.unwrap();
        assert_eq!(saved.room_number.as_deref(), Some("201"));
        assert_eq!(saved.folio.len(), 1);
        assert!(desk.unsynced_ids().await.is_empty());
        desk.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_start_against_sqlite_and_persist() {
        let db = Arc::new(db_with_inventory().await);
        let mut config = config();
        config.fanout.enabled = false;
        let (desk, mut rx) = DeskHandle::start(&config, db.clone(), clock()).await.unwrap();

        let applied = desk
            .execute(Command::CreateReservation(request("Asha Rao", 1)))
            .await
            .unwrap();
        assert!(matches!(rx.recv().await.unwrap(), DeskEvent::Persisted { .. }));

        let saved = db.bookings().get(&applied.bookings[0].id).await.unwrap().unwrap();
        assert_eq!(saved.guest_name, "Asha Rao");

        desk.refresh().await.unwrap();
        assert_eq!(desk.snapshot().await.bookings().count(), 1);
        desk.shutdown().await.unwrap();
    }
}
