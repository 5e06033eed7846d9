//! Front-desk day views: who arrives, who leaves, who is in house.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::store::BookingStore;
use crate::types::{Booking, BookingStatus};

/// Bookings of one reservation arriving together (a single booking when it
/// has no reservation id).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArrivalGroup<'a> {
    pub key: String,
    pub guest_name: String,
    pub bookings: Vec<&'a Booking>,
}

/// Confirmed bookings arriving on `today`, grouped per reservation and
/// ordered by guest name.
pub fn arrivals(store: &BookingStore, today: NaiveDate) -> Vec<ArrivalGroup<'_>> {
    let mut groups: Vec<ArrivalGroup<'_>> = Vec::new();
    for booking in store
        .bookings()
        .filter(|b| b.status == BookingStatus::Confirmed && b.check_in == today)
    {
        let key = booking.reservation_id.clone().unwrap_or_else(|| booking.id.clone());
        match groups.iter_mut().find(|g| g.key == key) {
            Some(group) => group.bookings.push(booking),
            None => groups.push(ArrivalGroup {
                key,
                guest_name: booking.guest_name.clone(),
                bookings: vec![booking],
            }),
        }
    }
    groups.sort_by(|a, b| {
        a.guest_name
            .to_lowercase()
            .cmp(&b.guest_name.to_lowercase())
            .then_with(|| a.key.cmp(&b.key))
    });
    groups
}

/// Checked-in bookings due out on `today`.
pub fn departures(store: &BookingStore, today: NaiveDate) -> Vec<&Booking> {
    store
        .bookings()
        .filter(|b| b.status == BookingStatus::CheckedIn && b.check_out == today)
        .collect()
}

/// Checked-in bookings sleeping here on `today`.
pub fn in_house(store: &BookingStore, today: NaiveDate) -> Vec<&Booking> {
    store
        .bookings()
        .filter(|b| b.status == BookingStatus::CheckedIn && b.covers(today))
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Occupancy {
    pub occupied: u32,
    pub capacity: u32,
}

impl Occupancy {
    /// Occupied share in percent, 0 when there are no rooms.
    pub fn percentage(&self) -> f64 {
        if self.capacity == 0 {
            return 0.0;
        }
        self.occupied as f64 * 100.0 / self.capacity as f64
    }
}

/// Rooms held on `today` against total capacity.
pub fn occupancy(store: &BookingStore, today: NaiveDate) -> Occupancy {
    let capacity = store.room_types().iter().map(|rt| rt.total_capacity).sum();
    let occupied = store
        .bookings()
        .filter(|b| b.occupies_room() && b.covers(today))
        .count() as u32;
    Occupancy {
        occupied: occupied.min(capacity),
        capacity,
    }
}
