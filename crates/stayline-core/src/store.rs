//! # Booking Store
//!
//! The front desk's local cache of live events, keyed by id, with typed
//! query methods so no call site scans the collection by hand.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          BookingStore                                   │
//! │                                                                         │
//! │   room_types: Vec<RoomType>          (inventory, in display order)      │
//! │   bookings:   BTreeMap<id, Booking>  ─┐                                 │
//! │   rates:      BTreeMap<id, RateUpdate>├── SyncEvent::{Booking,RateUpdate}│
//! │   in_flight:  BTreeMap<id, count>    ─┘  persists not yet answered      │
//! │   failed:     BTreeSet<id>               last answer was a failure      │
//! │   rate_rules: RateRules                  weekly and event modifiers     │
//! │                                                                         │
//! │   bookings_by_room("101")        bookings_by_date_range(from, to)       │
//! │   room_type_for_room("101")      reservation("res-1717...")             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;

use crate::error::{CoreError, CoreResult};
use crate::rates::RateRules;
use crate::types::{Booking, ChannelConnection, PropertySettings, RateUpdate, RoomType, SyncEvent};

/// Local cache of room inventory and live events.
#[derive(Debug, Clone, Default)]
pub struct BookingStore {
    room_types: Vec<RoomType>,
    bookings: BTreeMap<String, Booking>,
    rates: BTreeMap<String, RateUpdate>,
    connections: Vec<ChannelConnection>,
    property: PropertySettings,
    rate_rules: RateRules,
    in_flight: BTreeMap<String, u32>,
    failed: BTreeSet<String>,
}

impl BookingStore {
    pub fn new(room_types: Vec<RoomType>) -> Self {
        BookingStore {
            room_types,
            ..Default::default()
        }
    }

    pub fn with_property(mut self, property: PropertySettings) -> Self {
        self.property = property;
        self
    }

    pub fn with_rate_rules(mut self, rules: RateRules) -> Self {
        self.rate_rules = rules;
        self
    }

    pub fn with_connections(mut self, connections: Vec<ChannelConnection>) -> Self {
        self.connections = connections;
        self
    }

    // =========================================================================
    // Inventory
    // =========================================================================

    pub fn room_types(&self) -> &[RoomType] {
        &self.room_types
    }

    pub fn room_type(&self, id: &str) -> Option<&RoomType> {
        self.room_types.iter().find(|rt| rt.id == id)
    }

    pub fn require_room_type(&self, id: &str) -> CoreResult<&RoomType> {
        self.room_type(id)
            .ok_or_else(|| CoreError::RoomTypeNotFound(id.to_string()))
    }

    /// The category that owns a physical room.
    pub fn room_type_for_room(&self, room_number: &str) -> Option<&RoomType> {
        self.room_types.iter().find(|rt| rt.has_room(room_number))
    }

    pub fn set_room_types(&mut self, room_types: Vec<RoomType>) {
        self.room_types = room_types;
    }

    pub fn property(&self) -> &PropertySettings {
        &self.property
    }

    pub fn set_property(&mut self, property: PropertySettings) {
        self.property = property;
    }

    pub fn rate_rules(&self) -> &RateRules {
        &self.rate_rules
    }

    pub fn set_rate_rules(&mut self, rules: RateRules) {
        self.rate_rules = rules;
    }

    pub fn connections(&self) -> &[ChannelConnection] {
        &self.connections
    }

    pub fn set_connections(&mut self, connections: Vec<ChannelConnection>) {
        self.connections = connections;
    }

    // =========================================================================
    // Events
    // =========================================================================

    /// Inserts or replaces an event by id.
    pub fn upsert(&mut self, event: SyncEvent) {
        match event {
            SyncEvent::Booking(b) => {
                self.bookings.insert(b.id.clone(), b);
            }
            SyncEvent::RateUpdate(r) => {
                self.rates.insert(r.id.clone(), r);
            }
        }
    }

    pub fn upsert_booking(&mut self, booking: Booking) {
        self.bookings.insert(booking.id.clone(), booking);
    }

    pub fn remove_booking(&mut self, id: &str) -> Option<Booking> {
        self.in_flight.remove(id);
        self.failed.remove(id);
        self.bookings.remove(id)
    }

    /// Replaces every booking with the server's copy and clears sync marks.
    pub fn replace_bookings(&mut self, bookings: Vec<Booking>) {
        self.bookings = bookings.into_iter().map(|b| (b.id.clone(), b)).collect();
        self.in_flight.clear();
        self.failed.clear();
    }

    /// All events, bookings first.
    pub fn events(&self) -> impl Iterator<Item = SyncEvent> + '_ {
        self.bookings
            .values()
            .cloned()
            .map(SyncEvent::Booking)
            .chain(self.rates.values().cloned().map(SyncEvent::RateUpdate))
    }

    pub fn rate_update(&self, id: &str) -> Option<&RateUpdate> {
        self.rates.get(id)
    }

    pub fn rate_updates(&self) -> impl Iterator<Item = &RateUpdate> {
        self.rates.values()
    }

    pub fn rate_update_mut(&mut self, id: &str) -> Option<&mut RateUpdate> {
        self.rates.get_mut(id)
    }

    // =========================================================================
    // Booking Queries
    // =========================================================================

    pub fn bookings(&self) -> impl Iterator<Item = &Booking> {
        self.bookings.values()
    }

    pub fn booking(&self, id: &str) -> Option<&Booking> {
        self.bookings.get(id)
    }

    pub fn require_booking(&self, id: &str) -> CoreResult<&Booking> {
        self.booking(id)
            .ok_or_else(|| CoreError::BookingNotFound(id.to_string()))
    }

    pub(crate) fn booking_mut(&mut self, id: &str) -> CoreResult<&mut Booking> {
        self.bookings
            .get_mut(id)
            .ok_or_else(|| CoreError::BookingNotFound(id.to_string()))
    }

    /// Every booking (any status) assigned to a physical room.
    pub fn bookings_by_room<'a>(&'a self, room_number: &'a str) -> impl Iterator<Item = &'a Booking> {
        self.bookings
            .values()
            .filter(move |b| b.room_number.as_deref() == Some(room_number))
    }

    /// Every booking (any status) sharing at least one night with `[from, to)`.
    pub fn bookings_by_date_range(&self, from: NaiveDate, to: NaiveDate) -> impl Iterator<Item = &Booking> {
        self.bookings.values().filter(move |b| b.overlaps(from, to))
    }

    pub fn bookings_of_type<'a>(&'a self, room_type_id: &'a str) -> impl Iterator<Item = &'a Booking> {
        self.bookings
            .values()
            .filter(move |b| b.room_type_id == room_type_id)
    }

    /// The sibling bookings of one multi-room reservation.
    pub fn reservation<'a>(&'a self, reservation_id: &'a str) -> impl Iterator<Item = &'a Booking> {
        self.bookings
            .values()
            .filter(move |b| b.reservation_id.as_deref() == Some(reservation_id))
    }

    /// The first occupying booking other than `exclude_id` that holds
    /// `room_number` for any night of `[start, end)`.
    pub fn room_conflict<'a>(
        &'a self,
        room_number: &'a str,
        start: NaiveDate,
        end: NaiveDate,
        exclude_id: Option<&str>,
    ) -> Option<&'a Booking> {
        self.bookings_by_room(room_number).find(|b| {
            b.occupies_room() && Some(b.id.as_str()) != exclude_id && b.overlaps(start, end)
        })
    }

    // =========================================================================
    // Sync Marks
    // =========================================================================

    /// Records a persist queued for `id`.
    pub fn begin_persist(&mut self, id: &str) {
        *self.in_flight.entry(id.to_string()).or_default() += 1;
    }

    /// Records that one queued persist for `id` has been answered. Returns
    /// true when none is left in flight.
    pub fn finish_persist(&mut self, id: &str) -> bool {
        match self.in_flight.get_mut(id) {
            Some(count) if *count > 1 => {
                *count -= 1;
                false
            }
            _ => {
                self.in_flight.remove(id);
                true
            }
        }
    }

    pub fn has_persist_in_flight(&self, id: &str) -> bool {
        self.in_flight.contains_key(id)
    }

    /// Marks a booking whose last persist failed: the local copy stays
    /// ahead of the server until a later persist lands.
    pub fn mark_unsynced(&mut self, id: &str) {
        self.failed.insert(id.to_string());
    }

    pub fn mark_synced(&mut self, id: &str) {
        self.failed.remove(id);
    }

    pub fn is_synced(&self, id: &str) -> bool {
        !self.in_flight.contains_key(id) && !self.failed.contains(id)
    }

    /// Bookings whose latest local change is not confirmed by the server.
    pub fn unsynced(&self) -> impl Iterator<Item = &Booking> {
        let ids: BTreeSet<&String> = self.in_flight.keys().chain(self.failed.iter()).collect();
        ids.into_iter().filter_map(move |id| self.bookings.get(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{booking, d, deluxe};
    use crate::types::BookingStatus;

    #[test]
    fn test_queries_by_room_and_range() {
        let mut store = BookingStore::new(vec![deluxe()]);
        store.upsert_booking(booking("a", "D-101", "2024-06-01", "2024-06-03"));
        store.upsert_booking(booking("b", "D-102", "2024-06-05", "2024-06-07"));

        let in_101: Vec<_> = store.bookings_by_room("D-101").map(|b| b.id.as_str()).collect();
        assert_eq!(in_101, vec!["a"]);

        let june_2_to_6: Vec<_> = store
            .bookings_by_date_range(d("2024-06-02"), d("2024-06-06"))
            .map(|b| b.id.as_str())
            .collect();
        assert_eq!(june_2_to_6, vec!["a", "b"]);

        assert_eq!(store.room_type_for_room("D-102").map(|rt| rt.id.as_str()), Some("deluxe"));
        assert!(store.room_type_for_room("Z-9").is_none());
    }

    #[test]
    fn test_room_conflict_ignores_self_and_terminal_bookings() {
        let mut store = BookingStore::new(vec![deluxe()]);
        store.upsert_booking(booking("a", "D-101", "2024-06-01", "2024-06-03"));
        let mut cancelled = booking("c", "D-101", "2024-06-03", "2024-06-05");
        cancelled.status = BookingStatus::Cancelled;
        store.upsert_booking(cancelled);

        assert!(store
            .room_conflict("D-101", d("2024-06-01"), d("2024-06-02"), Some("a"))
            .is_none());
        assert_eq!(
            store
                .room_conflict("D-101", d("2024-06-02"), d("2024-06-04"), None)
                .map(|b| b.id.as_str()),
            Some("a")
        );
        assert!(store
            .room_conflict("D-101", d("2024-06-03"), d("2024-06-05"), None)
            .is_none());
    }

    #[test]
    fn test_unsynced_marks_clear_on_replace() {
        let mut store = BookingStore::new(vec![deluxe()]);
        store.upsert_booking(booking("a", "D-101", "2024-06-01", "2024-06-03"));
        store.mark_unsynced("a");
        assert_eq!(store.unsynced().count(), 1);
        assert!(!store.is_synced("a"));

        store.replace_bookings(vec![booking("a", "D-101", "2024-06-01", "2024-06-03")]);
        assert!(store.is_synced("a"));
    }

    #[test]
    fn test_booking_stays_unsynced_until_last_persist_answers() {
        let mut store = BookingStore::new(vec![deluxe()]);
        store.upsert_booking(booking("a", "D-101", "2024-06-01", "2024-06-03"));
        store.begin_persist("a");
        store.begin_persist("a");

        assert!(!store.finish_persist("a"));
        assert!(!store.is_synced("a"));
        assert!(store.finish_persist("a"));
        assert!(store.is_synced("a"));

        // An answer nobody was waiting for is harmless
        assert!(store.finish_persist("a"));
        store.mark_unsynced("a");
        assert_eq!(store.unsynced().count(), 1);
    }

    #[test]
    fn test_events_are_discriminated() {
        let mut store = BookingStore::new(vec![deluxe()]);
        store.upsert(SyncEvent::Booking(booking("a", "D-101", "2024-06-01", "2024-06-03")));
        let kinds: Vec<_> = store.events().map(|e| e.kind()).collect();
        assert_eq!(kinds, vec![crate::types::EventKind::Booking]);
    }
}
