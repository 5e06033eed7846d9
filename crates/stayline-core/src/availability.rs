//! # Availability Index
//!
//! How many rooms of a type are free for every night of a stay.
//!
//! ## Algorithm
//! ```text
//!   capacity = 3            Jun 01   Jun 02   Jun 03
//!   booking A (occupying)     ■        ■
//!   booking B (occupying)              ■        ■
//!   batch row (same type)     ■
//!   ──────────────────────────────────────────────
//!   free                      1        1        2     → min = 1
//! ```
//! The tightest night governs the whole stay. Rows of the reservation
//! being built count against capacity too, so one submission cannot
//! double-book a type with itself.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::dates::StayRange;
use crate::store::BookingStore;

/// A not-yet-persisted stay competing for inventory (a reservation row).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateStay {
    pub room_type_id: String,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
}

impl CandidateStay {
    fn covers(&self, day: NaiveDate) -> bool {
        self.check_in <= day && day < self.check_out
    }
}

/// Free rooms of `room_type_id` for every night of `[check_in, check_out)`.
///
/// Returns 0 for an inverted or empty range and for an unknown type.
/// Bookings whose id is in `exclude_booking_ids` are ignored (a booking
/// being moved must not compete with itself).
pub fn available_count(
    store: &BookingStore,
    room_type_id: &str,
    check_in: NaiveDate,
    check_out: NaiveDate,
    exclude_booking_ids: &[&str],
) -> u32 {
    available_count_with_batch(store, room_type_id, check_in, check_out, exclude_booking_ids, &[])
}

/// [`available_count`], with other rows of the same submission counted
/// against capacity. `batch` must not contain the row being evaluated.
pub fn available_count_with_batch(
    store: &BookingStore,
    room_type_id: &str,
    check_in: NaiveDate,
    check_out: NaiveDate,
    exclude_booking_ids: &[&str],
    batch: &[CandidateStay],
) -> u32 {
    let Ok(range) = StayRange::new(check_in, check_out) else {
        return 0;
    };
    let Some(room_type) = store.room_type(room_type_id) else {
        return 0;
    };

    let competing: Vec<_> = store
        .bookings_of_type(room_type_id)
        .filter(|b| b.occupies_room())
        .filter(|b| !exclude_booking_ids.contains(&b.id.as_str()))
        .filter(|b| b.overlaps(check_in, check_out))
        .collect();
    let same_type_rows: Vec<_> = batch
        .iter()
        .filter(|c| c.room_type_id == room_type_id)
        .collect();

    range
        .days()
        .map(|day| {
            let held = competing.iter().filter(|b| b.covers(day)).count()
                + same_type_rows.iter().filter(|c| c.covers(day)).count();
            room_type.total_capacity.saturating_sub(held as u32)
        })
        .min()
        .unwrap_or(0)
}

/// Availability of every row in a submission, each evaluated against the
/// others. A row with 0 blocks the submission.
pub fn batch_availability(store: &BookingStore, rows: &[CandidateStay]) -> Vec<u32> {
    rows.iter()
        .enumerate()
        .map(|(idx, row)| {
            let others: Vec<CandidateStay> = rows
                .iter()
                .enumerate()
                .filter(|(other, _)| *other != idx)
                .map(|(_, c)| c.clone())
                .collect();
            available_count_with_batch(store, &row.room_type_id, row.check_in, row.check_out, &[], &others)
        })
        .collect()
}
