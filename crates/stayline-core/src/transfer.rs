//! # Room Transfer Processor
//!
//! Moves a guest to another room (and possibly another room type) from an
//! effective date.
//!
//! ```text
//!   effective_date == check_in                effective_date > check_in
//!   ─────────── FULL MOVE ───────────         ───────── MID-STAY SPLIT ─────────
//!
//!   101  ████████████   (before)              101  ████████████   (before)
//!   205  ████████████   (after, same id)      101  ████              original, truncated
//!                                             205      ████████      continuation (new id)
//!                                                  ^   ^       ^
//!                                             check_in │   check_out
//!                                                effective_date
//! ```
//!
//! The continuation stays in the source's reservation (same
//! `reservation_id` and `number_of_rooms`): the guest still holds one room
//! of that reservation, only for different nights.
//!
//! ## Folio Policy
//! With `transfer_folio`, unpaid lines move to the continuation; paid lines
//! and every payment stay on the original. Nothing is prorated. A full
//! move keeps the folio on its single record.
//!
//! ## Rate Policy
//! `keep_rate` locks the nightly rate in force before the transfer onto the
//! moved record (`rate_override`). A channel quote is split as
//! `rate × nights` for the first segment with the remainder on the second,
//! so the two amounts sum to the original quote. Without `keep_rate` the
//! moved part is priced at the target type's sell rate.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::dates::billable_nights;
use crate::error::{CoreError, CoreResult, ValidationError};
use crate::ledger::{room_rate, EXTRA_BED_DESCRIPTION};
use crate::money::Money;
use crate::pricing::stay_price;
use crate::store::BookingStore;
use crate::types::{Booking, FolioItem, RoomType};

/// A request to move a booking's guest to another room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferRequest {
    pub new_room_type_id: String,
    pub new_room_number: String,
    pub effective_date: NaiveDate,
    #[serde(default)]
    pub keep_rate: bool,
    #[serde(default)]
    pub transfer_folio: bool,
}

/// Result of a transfer. Bookings are returned with versions bumped.
#[derive(Debug, Clone, PartialEq)]
pub enum TransferOutcome {
    /// The booking now lives in the new room; same id, same dates.
    FullMove(Booking),
    /// The original ends on the effective date; the continuation covers the
    /// rest of the stay in the new room.
    Split { original: Booking, continuation: Booking },
}

impl TransferOutcome {
    /// The record in the new room.
    pub fn moved(&self) -> &Booking {
        match self {
            TransferOutcome::FullMove(b) => b,
            TransferOutcome::Split { continuation, .. } => continuation,
        }
    }

    pub fn into_bookings(self) -> Vec<Booking> {
        match self {
            TransferOutcome::FullMove(b) => vec![b],
            TransferOutcome::Split { original, continuation } => vec![original, continuation],
        }
    }
}

/// Id of the continuation record created by a mid-stay split: the source
/// id plus the version the split stamps on it. Versions only rise, so two
/// splits of one booking never share an id, and bookings never share a
/// source id.
pub fn continuation_id(original: &Booking, split_version: i64) -> String {
    format!("{}-tr{}", original.id, split_version)
}

fn validate(store: &BookingStore, booking: &Booking, request: &TransferRequest) -> CoreResult<()> {
    if !booking.occupies_room() {
        return Err(ValidationError::InvalidFormat {
            field: "status".to_string(),
            reason: format!("a {} booking cannot change rooms", booking.status.as_str()),
        }
        .into());
    }

    let target = store.require_room_type(&request.new_room_type_id)?;
    if !target.has_room(&request.new_room_number) {
        return Err(CoreError::RoomNotFound(request.new_room_number.clone()));
    }

    if request.effective_date < booking.check_in || request.effective_date >= booking.check_out {
        return Err(CoreError::InvalidTransferDate {
            effective_date: request.effective_date.to_string(),
            check_in: booking.check_in.to_string(),
            check_out: booking.check_out.to_string(),
        });
    }

    // The booking's own footprint never conflicts with itself
    if let Some(other) = store.room_conflict(
        &request.new_room_number,
        request.effective_date,
        booking.check_out,
        Some(&booking.id),
    ) {
        return Err(CoreError::RoomConflict {
            room_number: request.new_room_number.clone(),
            conflicting_booking_id: other.id.clone(),
        });
    }
    Ok(())
}

/// Runs a transfer against the live store without modifying it.
pub fn transfer(
    store: &BookingStore,
    booking: &Booking,
    request: &TransferRequest,
    now_millis: i64,
) -> CoreResult<TransferOutcome> {
    validate(store, booking, request)?;
    let target = store.require_room_type(&request.new_room_type_id)?;
    let current_rate = room_rate(booking, store.room_type(&booking.room_type_id));

    if request.effective_date == booking.check_in {
        Ok(TransferOutcome::FullMove(full_move(store, booking, target, request, current_rate, now_millis)))
    } else {
        let (original, continuation) = split(store, booking, target, request, current_rate, now_millis);
        Ok(TransferOutcome::Split { original, continuation })
    }
}

fn full_move(
    store: &BookingStore,
    booking: &Booking,
    target: &RoomType,
    request: &TransferRequest,
    current_rate: Money,
    now_millis: i64,
) -> Booking {
    let mut moved = booking.clone();
    moved.room_type_id = target.id.clone();
    moved.room_number = Some(request.new_room_number.clone());

    if request.keep_rate {
        moved.rate_override = Some(current_rate);
    } else {
        moved.rate_override = None;
        if !moved.source.is_direct() {
            moved.amount = stay_price(target, moved.source, store.connections(), moved.nights());
        }
    }
    moved.touch(now_millis);
    moved
}

fn split(
    store: &BookingStore,
    booking: &Booking,
    target: &RoomType,
    request: &TransferRequest,
    current_rate: Money,
    now_millis: i64,
) -> (Booking, Booking) {
    let mut original = booking.clone();
    original.check_out = request.effective_date;
    original.touch(now_millis);

    let first_nights = billable_nights(booking.check_in, request.effective_date);
    let second_nights = billable_nights(request.effective_date, booking.check_out);

    let (moved_folio, kept_folio): (Vec<FolioItem>, Vec<FolioItem>) = if request.transfer_folio {
        booking.folio.iter().cloned().partition(|item| !item.is_paid)
    } else {
        (Vec::new(), booking.folio.clone())
    };
    original.folio = kept_folio;

    let carries_extra_beds = moved_folio
        .iter()
        .any(|item| item.description.starts_with(EXTRA_BED_DESCRIPTION));

    let mut continuation = Booking {
        id: continuation_id(booking, original.timestamp),
        room_type_id: target.id.clone(),
        room_number: Some(request.new_room_number.clone()),
        check_in: request.effective_date,
        check_out: booking.check_out,
        timestamp: original.timestamp,
        channel_sync: BTreeMap::new(),
        extra_beds: if carries_extra_beds { booking.extra_beds } else { 0 },
        is_settled: false,
        folio: moved_folio,
        payments: Vec::new(),
        ..booking.clone()
    };
    if carries_extra_beds {
        original.extra_beds = 0;
    }

    if !booking.source.is_direct() {
        original.amount = current_rate * first_nights;
    }

    if request.keep_rate {
        continuation.rate_override = Some(current_rate);
        if !booking.source.is_direct() {
            continuation.amount = booking.amount - original.amount;
        }
    } else {
        continuation.rate_override = None;
        if !booking.source.is_direct() {
            continuation.amount = stay_price(target, booking.source, store.connections(), second_nights);
        }
    }

    (original, continuation)
}
