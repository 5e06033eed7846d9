//! # Commands & Reconciliation
//!
//! Every front-desk mutation is a [`Command`]. Applying one updates the
//! local store at once and returns the persistence work still owed to the
//! server; the server's answer is folded back by [`reconcile`], the single
//! place that decides what a persist outcome means for local state.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   Command ──► apply(store, cmd, clock)                                  │
//! │                 1. live = store[booking_id]                             │
//! │                 2. live.timestamp == expected_version ?  (StaleVersion) │
//! │                 3. mutate a working copy (validation, conflicts)        │
//! │                 4. bump version, write back, count a persist in flight  │
//! │                      │                                                  │
//! │                      ▼                                                  │
//! │               Applied { bookings, persist: PendingPersist }             │
//! │                                         │                               │
//! │                             (backend, possibly retried)                 │
//! │                                         ▼                               │
//! │   reconcile(store, pending, PersistOutcome)                             │
//! │       Saved     → server copies replace local stand-ins, mark synced    │
//! │       Rejected  → refresh from server copies, report                    │
//! │       Failed    → keep local state, stay unsynced ("local truth wins")  │
//! │                                                                         │
//! │   A booking with a later persist still queued keeps its local copy:    │
//! │   the answer to an earlier persist never overwrites a newer edit.      │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Any error from `apply` leaves the store untouched.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::dates::Clock;
use crate::error::{CoreError, CoreResult, ValidationError};
use crate::ledger::{self, NewCharge, PaymentRequest};
use crate::reservation::{create_reservation, ReservationRequest};
use crate::schedule::{plan_move, plan_resize};
use crate::status::{apply_status, StatusEffects};
use crate::store::BookingStore;
use crate::transfer::{transfer, TransferRequest};
use crate::types::{Booking, BookingStatus, ChannelStatus, GuestDetails, GuestProfile, PaymentStatus};
use crate::validation::validate_guest_name;

// =============================================================================
// Commands
// =============================================================================

/// A front-desk mutation. Commands on an existing booking carry the
/// version (`timestamp`) the clerk was looking at.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    CreateReservation(ReservationRequest),
    MoveBooking {
        booking_id: String,
        expected_version: i64,
        target_room: String,
        target_start: NaiveDate,
    },
    ResizeBooking {
        booking_id: String,
        expected_version: i64,
        new_check_out: NaiveDate,
    },
    ChangeStatus {
        booking_id: String,
        expected_version: i64,
        status: BookingStatus,
        rejection_reason: Option<String>,
    },
    TransferRoom {
        booking_id: String,
        expected_version: i64,
        request: TransferRequest,
    },
    AddCharge {
        booking_id: String,
        expected_version: i64,
        charge: NewCharge,
    },
    RemoveCharge {
        booking_id: String,
        expected_version: i64,
        item_id: String,
    },
    RecordPayment {
        booking_id: String,
        expected_version: i64,
        payment: PaymentRequest,
    },
    MarkItemPaid {
        booking_id: String,
        expected_version: i64,
        item_id: String,
        payment_id: String,
    },
    MarkItemUnpaid {
        booking_id: String,
        expected_version: i64,
        item_id: String,
    },
    SetPaymentStatus {
        booking_id: String,
        expected_version: i64,
        payment_id: String,
        status: PaymentStatus,
    },
    UpdateExtraBeds {
        booking_id: String,
        expected_version: i64,
        count: u32,
    },
    SetVip {
        booking_id: String,
        expected_version: i64,
        is_vip: bool,
    },
    SetSettled {
        booking_id: String,
        expected_version: i64,
        is_settled: bool,
    },
    UpdateSpecialRequests {
        booking_id: String,
        expected_version: i64,
        special_requests: Option<String>,
    },
    UpdateGuest {
        booking_id: String,
        expected_version: i64,
        guest_name: String,
        guest_details: GuestDetails,
        accessory_guests: Vec<GuestDetails>,
    },
}

impl Command {
    /// Short name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            Command::CreateReservation(_) => "create_reservation",
            Command::MoveBooking { .. } => "move_booking",
            Command::ResizeBooking { .. } => "resize_booking",
            Command::ChangeStatus { .. } => "change_status",
            Command::TransferRoom { .. } => "transfer_room",
            Command::AddCharge { .. } => "add_charge",
            Command::RemoveCharge { .. } => "remove_charge",
            Command::RecordPayment { .. } => "record_payment",
            Command::MarkItemPaid { .. } => "mark_item_paid",
            Command::MarkItemUnpaid { .. } => "mark_item_unpaid",
            Command::SetPaymentStatus { .. } => "set_payment_status",
            Command::UpdateExtraBeds { .. } => "update_extra_beds",
            Command::SetVip { .. } => "set_vip",
            Command::SetSettled { .. } => "set_settled",
            Command::UpdateSpecialRequests { .. } => "update_special_requests",
            Command::UpdateGuest { .. } => "update_guest",
        }
    }

    /// The existing booking this command mutates and the version it expects.
    pub fn target(&self) -> Option<(&str, i64)> {
        match self {
            Command::CreateReservation(_) => None,
            Command::MoveBooking { booking_id, expected_version, .. }
            | Command::ResizeBooking { booking_id, expected_version, .. }
            | Command::ChangeStatus { booking_id, expected_version, .. }
            | Command::TransferRoom { booking_id, expected_version, .. }
            | Command::AddCharge { booking_id, expected_version, .. }
            | Command::RemoveCharge { booking_id, expected_version, .. }
            | Command::RecordPayment { booking_id, expected_version, .. }
            | Command::MarkItemPaid { booking_id, expected_version, .. }
            | Command::MarkItemUnpaid { booking_id, expected_version, .. }
            | Command::SetPaymentStatus { booking_id, expected_version, .. }
            | Command::UpdateExtraBeds { booking_id, expected_version, .. }
            | Command::SetVip { booking_id, expected_version, .. }
            | Command::SetSettled { booking_id, expected_version, .. }
            | Command::UpdateSpecialRequests { booking_id, expected_version, .. }
            | Command::UpdateGuest { booking_id, expected_version, .. } => {
                Some((booking_id.as_str(), *expected_version))
            }
        }
    }
}

// =============================================================================
// Persistence Work
// =============================================================================

/// What the server must be told. Mirrors the REST write endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum PersistOp {
    /// `POST /api/bookings/bulk`
    CreateBookings { bookings: Vec<Booking> },
    /// `PUT /api/bookings/:id` with `If-Match: expected_version`
    UpdateBooking { booking: Booking, expected_version: i64 },
    /// `POST /api/bookings/:id/transfer`. `now_millis` is the desk clock
    /// reading the local transfer ran with, so the server derives the same
    /// versions and continuation id.
    TransferBooking {
        booking_id: String,
        expected_version: i64,
        request: TransferRequest,
        now_millis: i64,
    },
}

/// Persistence owed for one applied command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingPersist {
    pub op: PersistOp,
    /// Local records this persist covers (stand-ins until confirmed).
    pub booking_ids: Vec<String>,
    /// Returning-guest record to upsert once the booking is saved.
    pub guest_profile: Option<GuestProfile>,
}

/// Result of applying a command locally.
#[derive(Debug, Clone, PartialEq)]
pub struct Applied {
    /// Changed or created bookings, as now held in the store.
    pub bookings: Vec<Booking>,
    pub persist: PendingPersist,
    pub effects: StatusEffects,
}

// =============================================================================
// Apply
// =============================================================================

/// Fails with [`CoreError::StaleVersion`] unless `booking` is still at
/// `expected_version`.
pub fn ensure_version(booking: &Booking, expected_version: i64) -> CoreResult<()> {
    if booking.timestamp != expected_version {
        return Err(CoreError::StaleVersion {
            booking_id: booking.id.clone(),
            expected: expected_version,
            actual: booking.timestamp,
        });
    }
    Ok(())
}

/// Applies `command` to the local store.
pub fn apply(store: &mut BookingStore, command: Command, clock: &dyn Clock) -> CoreResult<Applied> {
    match command {
        Command::CreateReservation(request) => {
            let bookings = create_reservation(store, &request, clock)?;
            for booking in &bookings {
                store.upsert_booking(booking.clone());
                store.begin_persist(&booking.id);
            }
            Ok(Applied {
                persist: PendingPersist {
                    booking_ids: bookings.iter().map(|b| b.id.clone()).collect(),
                    op: PersistOp::CreateBookings {
                        bookings: bookings.clone(),
                    },
                    guest_profile: None,
                },
                bookings,
                effects: StatusEffects::default(),
            })
        }

        Command::TransferRoom {
            booking_id,
            expected_version,
            request,
        } => {
            let live = store.require_booking(&booking_id)?;
            ensure_version(live, expected_version)?;
            let now_millis = clock.now_millis();
            let outcome = transfer(store, live, &request, now_millis)?;
            let bookings = outcome.into_bookings();
            for booking in &bookings {
                store.upsert_booking(booking.clone());
                store.begin_persist(&booking.id);
            }
            Ok(Applied {
                persist: PendingPersist {
                    booking_ids: bookings.iter().map(|b| b.id.clone()).collect(),
                    op: PersistOp::TransferBooking {
                        booking_id,
                        expected_version,
                        request,
                        now_millis,
                    },
                    guest_profile: None,
                },
                bookings,
                effects: StatusEffects::default(),
            })
        }

        other => apply_to_booking(store, other, clock),
    }
}

/// Commands that rewrite one existing booking.
fn apply_to_booking(store: &mut BookingStore, command: Command, clock: &dyn Clock) -> CoreResult<Applied> {
    let Some((booking_id, expected_version)) = command.target() else {
        return Err(not_a_booking_edit(&command));
    };
    let booking_id = booking_id.to_string();
    let live = store.require_booking(&booking_id)?;
    ensure_version(live, expected_version)?;

    let mut working = live.clone();
    let now = clock.now();
    let mut effects = StatusEffects::default();

    match command {
        Command::MoveBooking {
            target_room,
            target_start,
            ..
        } => {
            plan_move(store, &working, &target_room, target_start)?.apply_to(&mut working);
        }
        Command::ResizeBooking { new_check_out, .. } => {
            working.check_out = plan_resize(store, &working, new_check_out)?;
        }
        Command::ChangeStatus {
            status,
            rejection_reason,
            ..
        } => {
            effects = apply_status(store, &mut working, status, clock)?;
            working.rejection_reason = if status == BookingStatus::Rejected {
                rejection_reason
            } else {
                None
            };
        }
        Command::AddCharge { charge, .. } => {
            ledger::add_charge(&mut working, charge, now)?;
        }
        Command::RemoveCharge { item_id, .. } => {
            ledger::remove_charge(&mut working, &item_id)?;
        }
        Command::RecordPayment { payment, .. } => {
            ledger::record_payment(&mut working, payment, now)?;
        }
        Command::MarkItemPaid {
            item_id, payment_id, ..
        } => {
            ledger::mark_item_paid(&mut working, &item_id, &payment_id)?;
        }
        Command::MarkItemUnpaid { item_id, .. } => {
            ledger::mark_item_unpaid(&mut working, &item_id)?;
        }
        Command::SetPaymentStatus {
            payment_id, status, ..
        } => {
            ledger::set_payment_status(&mut working, &payment_id, status)?;
        }
        Command::UpdateExtraBeds { count, .. } => {
            let room_type = store.require_room_type(&working.room_type_id)?;
            ledger::update_extra_beds(&mut working, room_type, count, now);
        }
        Command::SetVip { is_vip, .. } => working.is_vip = is_vip,
        Command::SetSettled { is_settled, .. } => working.is_settled = is_settled,
        Command::UpdateSpecialRequests { special_requests, .. } => {
            working.special_requests = special_requests.filter(|s| !s.trim().is_empty());
        }
        Command::UpdateGuest {
            guest_name,
            mut guest_details,
            accessory_guests,
            ..
        } => {
            validate_guest_name(&guest_name)?;
            working.guest_name = guest_name.trim().to_string();
            guest_details.restore_masked_id(working.guest_details.as_ref());
            working.guest_details = Some(guest_details);
            let previous = std::mem::take(&mut working.accessory_guests);
            working.accessory_guests = accessory_guests
                .into_iter()
                .enumerate()
                .map(|(idx, mut guest)| {
                    guest.restore_masked_id(previous.get(idx));
                    guest
                })
                .collect();
        }
        other @ (Command::CreateReservation(_) | Command::TransferRoom { .. }) => {
            return Err(not_a_booking_edit(&other));
        }
    }

    working.touch(clock.now_millis());
    store.upsert_booking(working.clone());
    store.begin_persist(&booking_id);

    Ok(Applied {
        persist: PendingPersist {
            booking_ids: vec![booking_id],
            op: PersistOp::UpdateBooking {
                booking: working.clone(),
                expected_version,
            },
            guest_profile: effects.guest_profile.clone(),
        },
        bookings: vec![working],
        effects,
    })
}

fn not_a_booking_edit(command: &Command) -> CoreError {
    ValidationError::InvalidFormat {
        field: "command".to_string(),
        reason: format!("{} is not a single-booking edit", command.name()),
    }
    .into()
}

/// Records a channel's delivery status. System-originated, so the version
/// is left alone and no persist is owed.
pub fn record_channel_status(
    store: &mut BookingStore,
    booking_id: &str,
    channel: &str,
    status: ChannelStatus,
) -> CoreResult<()> {
    let booking = store.booking_mut(booking_id)?;
    booking.channel_sync.insert(channel.to_string(), status);
    Ok(())
}

// =============================================================================
// Reconcile
// =============================================================================

/// What the server said about a [`PendingPersist`].
#[derive(Debug, Clone, PartialEq)]
pub enum PersistOutcome {
    /// Saved; the server's canonical copies.
    Saved(Vec<Booking>),
    /// Refused (availability conflict, stale version). `server_copies` are
    /// the server's current versions of the affected bookings, if any exist.
    Rejected {
        code: String,
        message: String,
        server_copies: Vec<Booking>,
    },
    /// Never reached a verdict (timeout, connection, retries exhausted).
    Failed { reason: String },
}

/// How local state was settled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reconciliation {
    Synced { booking_ids: Vec<String> },
    Refreshed { code: String, message: String },
    KeptLocal { booking_ids: Vec<String>, reason: String },
}

/// Folds a persist outcome back into the store.
///
/// Saved copies replace local stand-ins (a stand-in the server did not
/// return, such as a continuation created under a different id, is
/// dropped). A rejection refreshes from the server copies. A failure keeps
/// the local mutation and leaves it unsynced.
///
/// While a later persist for the same booking is still queued, its local
/// copy is newer than anything this answer carries and is left alone; the
/// booking stays unsynced until that last persist is answered.
pub fn reconcile(store: &mut BookingStore, pending: &PendingPersist, outcome: PersistOutcome) -> Reconciliation {
    match outcome {
        PersistOutcome::Saved(saved) => {
            replace_stand_ins(store, pending, saved, false);
            Reconciliation::Synced {
                booking_ids: pending.booking_ids.clone(),
            }
        }
        PersistOutcome::Rejected {
            code,
            message,
            server_copies,
        } => {
            replace_stand_ins(store, pending, server_copies, true);
            Reconciliation::Refreshed { code, message }
        }
        PersistOutcome::Failed { reason } => {
            for id in &pending.booking_ids {
                store.finish_persist(id);
                store.mark_unsynced(id);
            }
            Reconciliation::KeptLocal {
                booking_ids: pending.booking_ids.clone(),
                reason,
            }
        }
    }
}

fn replace_stand_ins(store: &mut BookingStore, pending: &PendingPersist, canonical: Vec<Booking>, server_wins: bool) {
    for id in &pending.booking_ids {
        let idle = store.finish_persist(id);
        if idle && !canonical.iter().any(|b| &b.id == id) {
            store.remove_booking(id);
        }
    }
    for booking in canonical {
        let id = booking.id.clone();
        if store.has_persist_in_flight(&id) {
            continue;
        }
        // A failed later edit is still the local truth
        let local_is_newer = store
            .booking(&id)
            .is_some_and(|local| local.timestamp > booking.timestamp);
        if local_is_newer && !server_wins {
            continue;
        }
        store.upsert_booking(booking);
        store.mark_synced(&id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dates::FixedClock;
    use crate::ledger::summarize;
    use crate::money::Money;
    use crate::reservation::ReservationRow;
    use crate::test_support::{booking, clock, d, deluxe, suite};
    use crate::types::{BookingSource, FolioCategory, PaymentCategory, PaymentMethod};

    fn store() -> BookingStore {
        let mut store = BookingStore::new(vec![deluxe(), suite()]);
        store.upsert_booking(booking("a", "D-101", "2024-06-01", "2024-06-04"));
        store
    }

    fn move_a(version: i64, room: &str, start: &str) -> Command {
        Command::MoveBooking {
            booking_id: "a".to_string(),
            expected_version: version,
            target_room: room.to_string(),
            target_start: d(start),
        }
    }

    #[test]
    fn test_move_commits_and_bumps_version() {
        let mut store = store();
        let clock = clock("2024-05-30");
        let applied = apply(&mut store, move_a(1_000, "S-202", "2024-06-02"), &clock).unwrap();

        let a = store.booking("a").unwrap();
        assert_eq!(a.room_number.as_deref(), Some("S-202"));
        assert_eq!(a.room_type_id, "suite");
        assert_eq!((a.check_in, a.check_out), (d("2024-06-02"), d("2024-06-05")));
        assert_eq!(a.timestamp, clock.now_millis());
        assert!(!store.is_synced("a"));
        assert_eq!(applied.persist.booking_ids, vec!["a".to_string()]);
        assert!(matches!(
            applied.persist.op,
            PersistOp::UpdateBooking { expected_version: 1_000, .. }
        ));
    }

    #[test]
    fn test_stale_move_leaves_booking_unchanged() {
        let mut store = store();
        let before = store.booking("a").unwrap().clone();
        let err = apply(&mut store, move_a(999, "S-202", "2024-06-02"), &clock("2024-05-30")).unwrap_err();

        assert!(err.is_lock_conflict());
        assert!(err.to_string().starts_with("This booking was modified by another user. Please refresh."));
        assert_eq!(store.booking("a"), Some(&before));
        assert!(store.is_synced("a"));
    }

    #[test]
    fn test_every_mutation_checks_version() {
        let mut store = store();
        let stale = Command::AddCharge {
            booking_id: "a".to_string(),
            expected_version: 1,
            charge: NewCharge {
                category: FolioCategory::Other,
                description: "Minibar".to_string(),
                amount: Money::from_major(50),
                is_inclusive: false,
            },
        };
        assert!(matches!(
            apply(&mut store, stale, &clock("2024-06-01")),
            Err(CoreError::StaleVersion { .. })
        ));
        assert!(store.booking("a").unwrap().folio.is_empty());
    }

    #[test]
    fn test_conflicting_move_is_refused() {
        let mut store = store();
        store.upsert_booking(booking("b", "D-102", "2024-06-01", "2024-06-03"));
        let err = apply(&mut store, move_a(1_000, "D-102", "2024-06-01"), &clock("2024-05-30")).unwrap_err();
        assert!(matches!(err, CoreError::RoomConflict { .. }));
        assert_eq!(store.booking("a").unwrap().room_number.as_deref(), Some("D-101"));
    }

    #[test]
    fn test_sequential_mutations_chain_versions() {
        let mut store = store();
        let t0 = clock("2024-06-01");
        let first = apply(
            &mut store,
            Command::SetVip {
                booking_id: "a".to_string(),
                expected_version: 1_000,
                is_vip: true,
            },
            &t0,
        )
        .unwrap();
        let v1 = first.bookings[0].timestamp;

        // Same millisecond: the version still moves forward
        let second = apply(
            &mut store,
            Command::RecordPayment {
                booking_id: "a".to_string(),
                expected_version: v1,
                payment: PaymentRequest {
                    amount: Money::from_major(3000),
                    method: PaymentMethod::Cash,
                    category: PaymentCategory::Room,
                    description: None,
                    folio_item_id: None,
                },
            },
            &t0,
        )
        .unwrap();
        assert!(second.bookings[0].timestamp > v1);

        let a = store.booking("a").unwrap();
        assert!(a.is_vip);
        assert!(summarize(a, store.room_type("deluxe")).can_check_out());
    }

    #[test]
    fn test_check_in_then_check_out_flow() {
        let mut store = store();
        let day1 = clock("2024-06-01");
        let mut details = GuestDetails::default();
        details.phone_number = Some("9000000001".to_string());
        let guest = apply(
            &mut store,
            Command::UpdateGuest {
                booking_id: "a".to_string(),
                expected_version: 1_000,
                guest_name: "Asha Rao".to_string(),
                guest_details: details,
                accessory_guests: vec![],
            },
            &day1,
        )
        .unwrap();

        let checked_in = apply(
            &mut store,
            Command::ChangeStatus {
                booking_id: "a".to_string(),
                expected_version: guest.bookings[0].timestamp,
                status: BookingStatus::CheckedIn,
                rejection_reason: None,
            },
            &day1.advanced(1),
        )
        .unwrap();
        assert_eq!(
            checked_in.persist.guest_profile.as_ref().map(|p| p.name.as_str()),
            Some("Asha Rao")
        );

        let day4: FixedClock = clock("2024-06-04");
        let blocked = apply(
            &mut store,
            Command::ChangeStatus {
                booking_id: "a".to_string(),
                expected_version: checked_in.bookings[0].timestamp,
                status: BookingStatus::CheckedOut,
                rejection_reason: None,
            },
            &day4,
        );
        assert!(matches!(blocked, Err(CoreError::CheckoutBlocked { .. })));
        assert_eq!(store.booking("a").unwrap().status, BookingStatus::CheckedIn);
    }

    #[test]
    fn test_rejection_reason_only_while_rejected() {
        let mut store = store();
        let t = clock("2024-06-01");
        let rejected = apply(
            &mut store,
            Command::ChangeStatus {
                booking_id: "a".to_string(),
                expected_version: 1_000,
                status: BookingStatus::Rejected,
                rejection_reason: Some("Card declined".to_string()),
            },
            &t,
        )
        .unwrap();
        assert_eq!(rejected.bookings[0].rejection_reason.as_deref(), Some("Card declined"));

        let restored = apply(
            &mut store,
            Command::ChangeStatus {
                booking_id: "a".to_string(),
                expected_version: rejected.bookings[0].timestamp,
                status: BookingStatus::Confirmed,
                rejection_reason: None,
            },
            &t.advanced(5),
        )
        .unwrap();
        assert!(restored.bookings[0].rejection_reason.is_none());
    }

    #[test]
    fn test_create_then_reconcile_with_server_copies() {
        let mut store = store();
        let request = ReservationRequest {
            guest_name: "Vikram".to_string(),
            phone_number: None,
            email: None,
            guest_details: None,
            source: BookingSource::Direct,
            special_requests: None,
            is_vip: false,
            rooms: vec![ReservationRow {
                room_type_id: "suite".to_string(),
                check_in: d("2024-06-10"),
                check_out: d("2024-06-12"),
                room_number: None,
                pax: None,
                extra_beds: 0,
            }],
        };
        let applied = apply(&mut store, Command::CreateReservation(request), &clock("2024-06-01")).unwrap();
        let id = applied.bookings[0].id.clone();
        assert!(!store.is_synced(&id));

        let mut canonical = applied.bookings[0].clone();
        canonical.timestamp += 7;
        let result = reconcile(&mut store, &applied.persist, PersistOutcome::Saved(vec![canonical.clone()]));
        assert_eq!(result, Reconciliation::Synced { booking_ids: vec![id.clone()] });
        assert_eq!(store.booking(&id), Some(&canonical));
        assert!(store.is_synced(&id));
    }

    #[test]
    fn test_failed_persist_keeps_local_truth() {
        let mut store = store();
        let applied = apply(&mut store, move_a(1_000, "D-102", "2024-06-01"), &clock("2024-05-30")).unwrap();
        let result = reconcile(
            &mut store,
            &applied.persist,
            PersistOutcome::Failed {
                reason: "timed out".to_string(),
            },
        );
        assert!(matches!(result, Reconciliation::KeptLocal { .. }));
        assert_eq!(store.booking("a").unwrap().room_number.as_deref(), Some("D-102"));
        assert_eq!(store.unsynced().count(), 1);
    }

    #[test]
    fn test_rejected_create_drops_stand_ins() {
        let mut store = store();
        let request = ReservationRequest {
            guest_name: "Meera".to_string(),
            phone_number: None,
            email: None,
            guest_details: None,
            source: BookingSource::Direct,
            special_requests: None,
            is_vip: false,
            rooms: vec![ReservationRow {
                room_type_id: "deluxe".to_string(),
                check_in: d("2024-06-10"),
                check_out: d("2024-06-11"),
                room_number: None,
                pax: None,
                extra_beds: 0,
            }],
        };
        let applied = apply(&mut store, Command::CreateReservation(request), &clock("2024-06-01")).unwrap();
        let result = reconcile(
            &mut store,
            &applied.persist,
            PersistOutcome::Rejected {
                code: "AVAILABILITY_CONFLICT".to_string(),
                message: "No deluxe rooms".to_string(),
                server_copies: vec![],
            },
        );
        assert!(matches!(result, Reconciliation::Refreshed { .. }));
        assert!(store.booking(&applied.bookings[0].id).is_none());
        assert_eq!(store.unsynced().count(), 0);
    }

    #[test]
    fn test_transfer_split_through_command() {
        let mut store = store();
        let applied = apply(
            &mut store,
            Command::TransferRoom {
                booking_id: "a".to_string(),
                expected_version: 1_000,
                request: TransferRequest {
                    new_room_type_id: "suite".to_string(),
                    new_room_number: "S-203".to_string(),
                    effective_date: d("2024-06-02"),
                    keep_rate: true,
                    transfer_folio: true,
                },
            },
            &clock("2024-06-02"),
        )
        .unwrap();
        assert_eq!(applied.bookings.len(), 2);
        assert_eq!(store.bookings().count(), 2);
        assert_eq!(store.unsynced().count(), 2);
        assert_eq!(store.booking("a").unwrap().check_out, d("2024-06-02"));
    }

    #[test]
    fn test_earlier_save_keeps_later_local_edit() {
        let mut store = store();
        let t = clock("2024-06-01");
        let first = apply(
            &mut store,
            Command::SetVip {
                booking_id: "a".to_string(),
                expected_version: 1_000,
                is_vip: true,
            },
            &t,
        )
        .unwrap();
        let second = apply(
            &mut store,
            Command::SetSettled {
                booking_id: "a".to_string(),
                expected_version: first.bookings[0].timestamp,
                is_settled: true,
            },
            &t,
        )
        .unwrap();

        reconcile(&mut store, &first.persist, PersistOutcome::Saved(first.bookings.clone()));
        let a = store.booking("a").unwrap();
        assert!(a.is_vip);
        assert!(a.is_settled);
        assert_eq!(a.timestamp, second.bookings[0].timestamp);
        assert!(!store.is_synced("a"));

        reconcile(&mut store, &second.persist, PersistOutcome::Saved(second.bookings.clone()));
        assert!(store.booking("a").unwrap().is_settled);
        assert!(store.is_synced("a"));
    }

    #[test]
    fn test_failed_later_edit_survives_earlier_save() {
        let mut store = store();
        let t = clock("2024-05-30");
        let first = apply(&mut store, move_a(1_000, "D-102", "2024-06-01"), &t).unwrap();
        let second = apply(
            &mut store,
            Command::SetVip {
                booking_id: "a".to_string(),
                expected_version: first.bookings[0].timestamp,
                is_vip: true,
            },
            &t,
        )
        .unwrap();

        reconcile(
            &mut store,
            &second.persist,
            PersistOutcome::Failed {
                reason: "offline".to_string(),
            },
        );
        reconcile(&mut store, &first.persist, PersistOutcome::Saved(first.bookings.clone()));
        assert!(store.booking("a").unwrap().is_vip);
        assert!(!store.is_synced("a"));
    }

    #[test]
    fn test_transfer_persist_carries_desk_clock() {
        let mut store = store();
        let t = clock("2024-06-01");
        let applied = apply(
            &mut store,
            Command::TransferRoom {
                booking_id: "a".to_string(),
                expected_version: 1_000,
                request: TransferRequest {
                    new_room_type_id: "suite".to_string(),
                    new_room_number: "S-201".to_string(),
                    effective_date: d("2024-06-01"),
                    keep_rate: false,
                    transfer_folio: false,
                },
            },
            &t,
        )
        .unwrap();
        assert!(matches!(
            applied.persist.op,
            PersistOp::TransferBooking { now_millis, .. } if now_millis == t.now_millis()
        ));
    }

    #[test]
    fn test_non_edit_commands_name_themselves() {
        let mut store = store();
        let transfer = Command::TransferRoom {
            booking_id: "a".to_string(),
            expected_version: 1_000,
            request: TransferRequest {
                new_room_type_id: "suite".to_string(),
                new_room_number: "S-201".to_string(),
                effective_date: d("2024-06-01"),
                keep_rate: false,
                transfer_folio: false,
            },
        };
        let err = apply_to_booking(&mut store, transfer, &clock("2024-06-01")).unwrap_err();
        assert!(err.to_string().contains("transfer_room"));
        assert_eq!(store.booking("a").unwrap().room_number.as_deref(), Some("D-101"));
    }

    #[test]
    fn test_channel_status_does_not_bump_version() {
        let mut store = store();
        record_channel_status(&mut store, "a", "MMT", ChannelStatus::Success).unwrap();
        let a = store.booking("a").unwrap();
        assert_eq!(a.timestamp, 1_000);
        assert_eq!(a.channel_sync.get("MMT"), Some(&ChannelStatus::Success));
        assert!(record_channel_status(&mut store, "zz", "MMT", ChannelStatus::Error).is_err());
    }
}
