//! Shared fixtures for repository tests.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use stayline_core::money::Money;
use stayline_core::{Booking, BookingSource, BookingStatus, RoomType};

use crate::{Database, DbConfig};

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
        amenities: vec!["WiFi".to_string(), "AC".to_string()],
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
