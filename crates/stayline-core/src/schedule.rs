//! # Schedule Mutator
//!
//! Drag-to-move and resize on the front-desk grid.
//!
//! ## Move Protocol
//! ```text
//!   drag start ── snapshot = booking.timestamp
//!       │
//!       │  pointer over (room, day) ──► is_drop_valid()   (highlight only)
//!       ▼
//!   drop ──► plan_move()
//!              1. nights    = check_out - check_in
//!              2. check_out'= target_start + nights
//!              3. no occupying booking in target room overlaps
//!              4. live timestamp == snapshot   (else StaleVersion)
//!              5. commit: room, room type, dates, timestamp = now
//! ```
//! Step 4 is enforced by [`crate::command`] for every mutation, not only
//! moves.

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::store::BookingStore;
use crate::types::Booking;

/// Where a booking lands after a move or resize.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Placement {
    pub room_number: String,
    pub room_type_id: String,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
}

impl Placement {
    /// Writes the placement onto a booking.
    pub fn apply_to(&self, booking: &mut Booking) {
        booking.room_number = Some(self.room_number.clone());
        booking.room_type_id = self.room_type_id.clone();
        booking.check_in = self.check_in;
        booking.check_out = self.check_out;
    }
}

fn ensure_room_free(store: &BookingStore, placement: &Placement, booking_id: &str) -> CoreResult<()> {
    match store.room_conflict(&placement.room_number, placement.check_in, placement.check_out, Some(booking_id)) {
        Some(other) => Err(CoreError::RoomConflict {
            room_number: placement.room_number.clone(),
            conflicting_booking_id: other.id.clone(),
        }),
        None => Ok(()),
    }
}

/// Validates moving `booking` to `target_room` starting `target_start`,
/// keeping its length. The room type follows the target room.
pub fn plan_move(
    store: &BookingStore,
    booking: &Booking,
    target_room: &str,
    target_start: NaiveDate,
) -> CoreResult<Placement> {
    let room_type = store
        .room_type_for_room(target_room)
        .ok_or_else(|| CoreError::RoomNotFound(target_room.to_string()))?;
    let nights = (booking.check_out - booking.check_in).num_days().max(1);

    let placement = Placement {
        room_number: target_room.to_string(),
        room_type_id: room_type.id.clone(),
        check_in: target_start,
        check_out: target_start + Duration::days(nights),
    };
    ensure_room_free(store, &placement, &booking.id)?;
    Ok(placement)
}

/// Whether dropping `booking` on `(target_room, target_start)` would
/// succeed. Recomputed continuously while dragging.
pub fn is_drop_valid(store: &BookingStore, booking: &Booking, target_room: &str, target_start: NaiveDate) -> bool {
    plan_move(store, booking, target_room, target_start).is_ok()
}

/// Validates a resize: `check_in` stays, `check_out` becomes `new_check_out`
/// (at least one night). Returns the validated check-out date.
pub fn plan_resize(store: &BookingStore, booking: &Booking, new_check_out: NaiveDate) -> CoreResult<NaiveDate> {
    if new_check_out <= booking.check_in {
        return Err(ValidationError::InvalidDateRange {
            check_in: booking.check_in.to_string(),
            check_out: new_check_out.to_string(),
        }
        .into());
    }

    // Unassigned bookings only compete for type inventory
    if let Some(room_number) = booking.room_number.as_deref() {
        if let Some(other) = store.room_conflict(room_number, booking.check_in, new_check_out, Some(&booking.id)) {
            return Err(CoreError::RoomConflict {
                room_number: room_number.to_string(),
                conflicting_booking_id: other.id.clone(),
            });
        }
    }
    Ok(new_check_out)
}

/// Live resize feedback: the stay length after dragging the right edge by
/// `pixel_delta`, snapped to whole days and never below one night.
pub fn snap_resize_nights(current_nights: i64, pixel_delta: f64, day_width: f64) -> i64 {
    if !day_width.is_finite() || day_width <= 0.0 || !pixel_delta.is_finite() {
        return current_nights.max(1);
    }
    let days = (pixel_delta / day_width).round() as i64;
    (current_nights + days).max(1)
}
