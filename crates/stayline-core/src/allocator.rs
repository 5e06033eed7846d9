//! # Room Allocator
//!
//! Two functions that must never be confused:
//!
//! | Function | Writes state? | Used for |
//! |----------|---------------|----------|
//! | [`allocate_room`] | yes (result is persisted) | walk-ins, reservation rows |
//! | [`display_only_room_hint`] | **never** | drawing unassigned channel bookings on the grid |

use std::collections::HashSet;
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::store::BookingStore;
use crate::types::{Booking, RoomType};

/// Sentinel shown and serialized when no room could be assigned.
pub const UNASSIGNED: &str = "Unassigned";

/// Outcome of an allocation attempt. Serialized as the room number or the
/// `"Unassigned"` sentinel.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RoomAssignment {
    Room(String),
    Unassigned,
}

impl RoomAssignment {
    pub fn room(&self) -> Option<&str> {
        match self {
            RoomAssignment::Room(r) => Some(r),
            RoomAssignment::Unassigned => None,
        }
    }

    pub fn into_room(self) -> Option<String> {
        match self {
            RoomAssignment::Room(r) => Some(r),
            RoomAssignment::Unassigned => None,
        }
    }
}

impl fmt::Display for RoomAssignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.room().unwrap_or(UNASSIGNED))
    }
}

impl Serialize for RoomAssignment {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.room().unwrap_or(UNASSIGNED))
    }
}

impl<'de> Deserialize<'de> for RoomAssignment {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        Ok(if value == UNASSIGNED {
            RoomAssignment::Unassigned
        } else {
            RoomAssignment::Room(value)
        })
    }
}

/// Picks the first free room of `room_type` for `[check_in, check_out)`.
///
/// Rooms are tried in listed order. A room is skipped when it is already in
/// `taken_in_batch` or an occupying booking holds it for a shared night.
pub fn allocate_room(
    store: &BookingStore,
    room_type: &RoomType,
    check_in: NaiveDate,
    check_out: NaiveDate,
    taken_in_batch: &HashSet<String>,
) -> RoomAssignment {
    room_type
        .rooms()
        .iter()
        .filter(|room| !taken_in_batch.contains(room.as_str()))
        .find(|room| store.room_conflict(room, check_in, check_out, None).is_none())
        .map(|room| RoomAssignment::Room(room.clone()))
        .unwrap_or(RoomAssignment::Unassigned)
}

/// Whether `room_number` can take `[check_in, check_out)`, ignoring
/// `exclude_id` (the booking being placed, when it already exists).
pub fn is_room_free(
    store: &BookingStore,
    room_number: &str,
    check_in: NaiveDate,
    check_out: NaiveDate,
    exclude_id: Option<&str>,
) -> bool {
    store
        .room_conflict(room_number, check_in, check_out, exclude_id)
        .is_none()
}

/// A deterministic room to draw an unassigned channel booking in.
///
/// Hashes the booking id (sum of its code points) into the type's room
/// list. This is presentation only: the result is never an allocation and
/// must not be written back to the booking.
pub fn display_only_room_hint(booking: &Booking, room_type: &RoomType) -> RoomAssignment {
    if let Some(room) = &booking.room_number {
        return RoomAssignment::Room(room.clone());
    }
    let rooms = room_type.rooms();
    if rooms.is_empty() {
        return RoomAssignment::Unassigned;
    }
    let hash: u64 = booking.id.chars().map(|c| c as u64).sum();
    RoomAssignment::Room(rooms[(hash % rooms.len() as u64) as usize].clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{booking, d, deluxe};

    #[test]
    fn test_allocates_first_free_room_then_unassigned() {
        let mut store = BookingStore::new(vec![deluxe()]);
        store.upsert_booking(booking("a", "D-101", "2024-06-01", "2024-06-03"));
        let rt = deluxe();

        let second = allocate_room(&store, &rt, d("2024-06-01"), d("2024-06-03"), &HashSet::new());
        assert_eq!(second, RoomAssignment::Room("D-102".to_string()));

        store.upsert_booking(booking("b", "D-102", "2024-06-01", "2024-06-03"));
        let third = allocate_room(&store, &rt, d("2024-06-01"), d("2024-06-03"), &HashSet::new());
        assert_eq!(third, RoomAssignment::Unassigned);
        assert_eq!(third.to_string(), "Unassigned");
    }

    #[test]
    fn test_skips_rooms_taken_earlier_in_batch() {
        let store = BookingStore::new(vec![deluxe()]);
        let taken: HashSet<String> = ["D-101".to_string()].into_iter().collect();
        let room = allocate_room(&store, &deluxe(), d("2024-06-01"), d("2024-06-02"), &taken);
        assert_eq!(room.room(), Some("D-102"));
    }

    #[test]
    fn test_checkout_day_is_free_for_next_arrival() {
        let mut store = BookingStore::new(vec![deluxe()]);
        store.upsert_booking(booking("a", "D-101", "2024-06-01", "2024-06-03"));
        let room = allocate_room(&store, &deluxe(), d("2024-06-03"), d("2024-06-04"), &HashSet::new());
        assert_eq!(room.room(), Some("D-101"));
    }

    #[test]
    fn test_display_hint_is_deterministic_and_not_persisted() {
        let store = BookingStore::new(vec![deluxe()]);
        let mut channel = booking("mmt-1717-0", "D-101", "2024-06-01", "2024-06-03");
        channel.room_number = None;

        let first = display_only_room_hint(&channel, &deluxe());
        let again = display_only_room_hint(&channel, &deluxe());
        assert_eq!(first, again);
        assert!(first.room().is_some());
        assert!(channel.room_number.is_none());
        assert!(store.booking("mmt-1717-0").is_none());
    }

    #[test]
    fn test_display_hint_keeps_assigned_room() {
        let assigned = booking("a", "D-102", "2024-06-01", "2024-06-03");
        assert_eq!(display_only_room_hint(&assigned, &deluxe()).room(), Some("D-102"));
    }

    #[test]
    fn test_assignment_serializes_sentinel() {
        assert_eq!(
            serde_json::to_string(&RoomAssignment::Unassigned).unwrap(),
            "\"Unassigned\""
        );
        assert_eq!(
            serde_json::to_string(&RoomAssignment::Room("D-101".to_string())).unwrap(),
            "\"D-101\""
        );
        let back: RoomAssignment = serde_json::from_str("\"Unassigned\"").unwrap();
        assert_eq!(back, RoomAssignment::Unassigned);
    }
}
