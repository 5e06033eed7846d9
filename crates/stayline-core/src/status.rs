//! # Booking Status State Machine
//!
//! ```text
//!                    ┌────────────┐
//!          ┌────────►│ Cancelled  │
//!          │         └─────┬──────┘
//!   ┌──────┴─────┐         │          ┌────────────┐       ┌────────────┐
//!   │ Confirmed  │─────────┼─────────►│ CheckedIn  │──────►│ CheckedOut │
//!   └──────┬─────┘         │          └──────┬─────┘       └──────┬─────┘
//!          │               ▼                 │                    │
//!          │         ┌────────────┐          │                    │
//!          └────────►│  Rejected  │◄─────────┴────────────────────┘
//!                    └────────────┘
//!                 (payment warning; may return to any other state)
//! ```
//!
//! Side effects:
//! - entering `CheckedIn` stamps the arrival time and yields a guest
//!   profile to upsert
//! - entering `CheckedOut` requires nothing outstanding, stamps the
//!   departure time, settles every folio line and yields the invoice
//! - entering an occupying state from a non-occupying one re-checks the
//!   room, since it may have been re-let meanwhile

use crate::dates::Clock;
use crate::error::{CoreError, CoreResult};
use crate::ledger::{build_invoice, settle_all_items, summarize, Invoice};
use crate::store::BookingStore;
use crate::types::{Booking, BookingStatus, GuestProfile};

use BookingStatus::*;

/// Whether `from → to` is an allowed transition.
pub fn can_transition(from: BookingStatus, to: BookingStatus) -> bool {
    matches!(
        (from, to),
        (Confirmed, CheckedIn | Cancelled | Rejected)
            | (CheckedIn, CheckedOut | Rejected)
            | (Rejected, Confirmed | CheckedIn | CheckedOut | Cancelled)
            | (CheckedOut, Rejected)
            | (Cancelled, Rejected)
    )
}

/// Statuses reachable from `from`.
pub fn next_statuses(from: BookingStatus) -> Vec<BookingStatus> {
    [Confirmed, CheckedIn, CheckedOut, Cancelled, Rejected]
        .into_iter()
        .filter(|to| can_transition(from, *to))
        .collect()
}

/// What a status change produced besides the booking itself.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatusEffects {
    /// Returning-guest record to upsert (check-in).
    pub guest_profile: Option<GuestProfile>,
    /// Final invoice (check-out).
    pub invoice: Option<Invoice>,
}

/// Moves `booking` (a working copy) to `to`, applying side effects.
///
/// `store` supplies the room type, property settings and the bookings
/// that might conflict. On error `booking` is unchanged.
pub fn apply_status(
    store: &BookingStore,
    booking: &mut Booking,
    to: BookingStatus,
    clock: &dyn Clock,
) -> CoreResult<StatusEffects> {
    if !can_transition(booking.status, to) {
        return Err(CoreError::InvalidStatusTransition {
            booking_id: booking.id.clone(),
            from: booking.status,
            to,
        });
    }

    if to.occupies_room() && !booking.occupies_room() {
        if let Some(room) = booking.room_number.as_deref() {
            if let Some(other) = store.room_conflict(room, booking.check_in, booking.check_out, Some(&booking.id)) {
                return Err(CoreError::RoomConflict {
                    room_number: room.to_string(),
                    conflicting_booking_id: other.id.clone(),
                });
            }
        }
    }

    let room_type = store.room_type(&booking.room_type_id);
    let mut effects = StatusEffects::default();
    let clock_time = clock.local_now().format("%H:%M").to_string();

    match to {
        CheckedIn => {
            booking.guest_details.get_or_insert_with(Default::default).arrival_time = Some(clock_time);
            effects.guest_profile = guest_profile_for(booking, clock);
        }
        CheckedOut => {
            let summary = summarize(booking, room_type);
            if !summary.can_check_out() {
                return Err(CoreError::CheckoutBlocked {
                    booking_id: booking.id.clone(),
                    outstanding: summary.net_outstanding,
                });
            }
            booking.guest_details.get_or_insert_with(Default::default).departure_time = Some(clock_time);
            settle_all_items(booking);
            effects.invoice = Some(build_invoice(booking, room_type, store.property(), clock.today()));
        }
        _ => {}
    }

    booking.status = to;
    Ok(effects)
}

/// Checks a whole-record replacement against the stored copy: a status
/// change must be an allowed transition, and a record arriving as
/// `CheckedOut` must owe nothing. Side effects are the sender's business.
pub fn validate_replacement(store: &BookingStore, current: &Booking, incoming: &Booking) -> CoreResult<()> {
    if incoming.status == current.status {
        return Ok(());
    }
    if !can_transition(current.status, incoming.status) {
        return Err(CoreError::InvalidStatusTransition {
            booking_id: incoming.id.clone(),
            from: current.status,
            to: incoming.status,
        });
    }
    if incoming.status == CheckedOut {
        let summary = summarize(incoming, store.room_type(&incoming.room_type_id));
        if !summary.can_check_out() {
            return Err(CoreError::CheckoutBlocked {
                booking_id: incoming.id.clone(),
                outstanding: summary.net_outstanding,
            });
        }
    }
    Ok(())
}

/// The returning-guest record for a checked-in booking. Profiles are keyed
/// by phone number, so none is produced without one.
pub fn guest_profile_for(booking: &Booking, clock: &dyn Clock) -> Option<GuestProfile> {
    let details = booking.guest_details.as_ref()?;
    let phone = details.phone_number.as_deref().map(str::trim).filter(|p| !p.is_empty())?;
    Some(GuestProfile {
        id: None,
        name: details.name.clone().unwrap_or_else(|| booking.guest_name.clone()),
        phone_number: phone.to_string(),
        id_type: details.id_type,
        address: details.address.clone(),
        dob: details.dob.clone(),
        nationality: details.nationality.clone(),
        preferences: booking.special_requests.clone(),
        last_check_in: Some(clock.today()),
    })
}
