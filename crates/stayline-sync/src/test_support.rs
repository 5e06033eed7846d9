//! Shared fixtures for desk service tests.

use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use stayline_core::money::Money;
use stayline_core::{
    Booking, BookingSource, BookingStatus, BookingStore, ChannelConnection, ConnectionStatus, GuestProfile,
    PersistOp, RoomType,
};
use stayline_db::{Database, DbConfig};

use crate::backend::PersistBackend;
use crate::error::{SyncError, SyncResult};

pub fn d(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

/// rt-1 "Deluxe": rooms 101 and 102 at ₹1000.
pub fn deluxe() -> RoomType {
    RoomType {
        id: "rt-1".to_string(),
        name: "Deluxe".to_string(),
        total_capacity: 2,
        base_occupancy: 2,
        base_price: Money::from_major(1000),
        floor_price: Money::from_major(800),
        ceiling_price: Money::from_major(2000),
        extra_bed_charge: Money::from_major(500),
        amenities: vec![],
        room_numbers: vec!["101".to_string(), "102".to_string()],
    }
}

/// rt-2 "Suite": rooms 201 to 203 at ₹3000.
pub fn suite() -> RoomType {
    RoomType {
        id: "rt-2".to_string(),
        name: "Suite".to_string(),
        total_capacity: 3,
        base_occupancy: 2,
        base_price: Money::from_major(3000),
        floor_price: Money::from_major(2500),
        ceiling_price: Money::from_major(6000),
        extra_bed_charge: Money::from_major(1000),
        amenities: vec![],
        room_numbers: vec!["201".to_string(), "202".to_string(), "203".to_string()],
    }
}

/// MMT connected, Booking.com connected with stop-sell on, Expedia off.
pub fn connections() -> Vec<ChannelConnection> {
    let connection = |name: &str, status, is_stopped| ChannelConnection {
        id: name.to_lowercase(),
        name: name.to_string(),
        key: String::new(),
        status,
        markup: None,
        is_stopped,
    };
    vec![
        connection("MMT", ConnectionStatus::Connected, false),
        connection("Booking.com", ConnectionStatus::Connected, true),
        connection("Expedia", ConnectionStatus::Disconnected, false),
    ]
}

pub fn store() -> BookingStore {
    BookingStore::new(vec![deluxe(), suite()]).with_connections(connections())
}

/// In-memory database holding [`deluxe`] and [`suite`].
pub async fn db_with_inventory() -> Database {
    let db = Database::new(DbConfig::in_memory()).await.unwrap();
    db.room_types().insert(&deluxe()).await.unwrap();
    db.room_types().insert(&suite()).await.unwrap();
    db
}

/// A confirmed direct rt-1 booking at version 1000.
pub fn booking(id: &str, room: &str, check_in: &str, check_out: &str) -> Booking {
    Booking {
        id: id.to_string(),
        reservation_id: None,
        room_type_id: "rt-1".to_string(),
        room_number: Some(room.to_string()),
        guest_name: format!("Guest {id}"),
        source: BookingSource::Direct,
        status: BookingStatus::Confirmed,
        timestamp: 1_000,
        check_in: d(check_in),
        check_out: d(check_out),
        amount: Money::zero(),
        rate_override: None,
        channel_sync: BTreeMap::new(),
        guest_details: None,
        accessory_guests: vec![],
        number_of_rooms: Some(1),
        pax: Some(2),
        extra_beds: 0,
        special_requests: None,
        rejection_reason: None,
        is_vip: false,
        is_settled: false,
        folio: vec![],
        payments: vec![],
    }
}

// =============================================================================
// Scripted Backend
// =============================================================================

/// What the next `persist` call does.
pub enum Step {
    /// Echo the op's bookings back as saved.
    Save,
    Fail(SyncError),
    /// Never answer (the caller's timeout fires).
    Hang,
}

/// A backend that follows a script, then saves everything.
#[derive(Default)]
pub struct ScriptedBackend {
    steps: Mutex<VecDeque<Step>>,
    server: Mutex<BTreeMap<String, Booking>>,
    guests: Mutex<Vec<GuestProfile>>,
    calls: AtomicUsize,
}

impl ScriptedBackend {
    pub fn new(steps: Vec<Step>) -> Self {
        ScriptedBackend {
            steps: Mutex::new(steps.into()),
            ..Default::default()
        }
    }

    /// Seeds a server copy returned by `fetch_bookings`.
    pub fn with_server_copy(self, booking: Booking) -> Self {
        self.server.lock().unwrap().insert(booking.id.clone(), booking);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn guests(&self) -> Vec<GuestProfile> {
        self.guests.lock().unwrap().clone()
    }
}

#[async_trait]
impl PersistBackend for ScriptedBackend {
    async fn persist(&self, op: &PersistOp) -> SyncResult<Vec<Booking>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let step = self.steps.lock().unwrap().pop_front().unwrap_or(Step::Save);
        match step {
            Step::Save => {
                let saved = match op {
                    PersistOp::CreateBookings { bookings } => bookings.clone(),
                    PersistOp::UpdateBooking { booking, .. } => vec![booking.clone()],
                    PersistOp::TransferBooking { booking_id, .. } => {
                        self.server.lock().unwrap().get(booking_id).cloned().into_iter().collect()
                    }
                };
                let mut server = self.server.lock().unwrap();
                for booking in &saved {
                    server.insert(booking.id.clone(), booking.clone());
                }
                Ok(saved)
            }
            Step::Fail(err) => Err(err),
            Step::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(vec![])
            }
        }
    }

    async fn fetch_bookings(&self, ids: &[String]) -> SyncResult<Vec<Booking>> {
        let server = self.server.lock().unwrap();
        Ok(ids.iter().filter_map(|id| server.get(id).cloned()).collect())
    }

    async fn save_guest(&self, profile: &GuestProfile) -> SyncResult<()> {
        self.guests.lock().unwrap().push(profile.clone());
        Ok(())
    }

    async fn load_store(&self) -> SyncResult<BookingStore> {
        let mut store = store();
        store.replace_bookings(self.server.lock().unwrap().values().cloned().collect());
        Ok(store)
    }
}
