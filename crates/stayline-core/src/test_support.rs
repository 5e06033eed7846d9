//! Shared fixtures for unit tests.

use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::dates::{parse_date, FixedClock};
use crate::money::Money;
use crate::types::{Booking, BookingSource, BookingStatus, RoomType};

pub fn d(s: &str) -> NaiveDate {
    parse_date("date", s).unwrap()
}

pub fn clock(day: &str) -> FixedClock {
    FixedClock::on(d(day))
}

/// "Deluxe": rooms D-101 and D-102, ₹1000/night, extra bed ₹500.
pub fn deluxe() -> RoomType {
    RoomType {
        id: "deluxe".to_string(),
        name: "Deluxe".to_string(),
        total_capacity: 2,
        base_occupancy: 2,
        base_price: Money::from_major(1000),
        floor_price: Money::from_major(800),
        ceiling_price: Money::from_major(2000),
        extra_bed_charge: Money::from_major(500),
        amenities: vec!["AC".to_string()],
        room_numbers: vec!["D-101".to_string(), "D-102".to_string()],
    }
}

/// "Suite": rooms S-201..S-203, ₹3000/night, extra bed ₹1000.
pub fn suite() -> RoomType {
    RoomType {
        id: "suite".to_string(),
        name: "Suite".to_string(),
        total_capacity: 3,
        base_occupancy: 2,
        base_price: Money::from_major(3000),
        floor_price: Money::from_major(2500),
        ceiling_price: Money::from_major(6000),
        extra_bed_charge: Money::from_major(1000),
        amenities: vec![],
        room_numbers: vec!["S-201".to_string(), "S-202".to_string(), "S-203".to_string()],
    }
}

/// A confirmed direct Deluxe booking at version 1000.
pub fn booking(id: &str, room: &str, check_in: &str, check_out: &str) -> Booking {
    Booking {
        id: id.to_string(),
        reservation_id: None,
        room_type_id: "deluxe".to_string(),
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
