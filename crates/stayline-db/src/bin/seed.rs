//! # Seed Data Generator
//!
//! Populates the database with a development property.
//!
//! ## Usage
//! ```bash
//! # Inventory, channels and 40 demo reservations (default)
//! cargo run -p stayline-db --bin seed
//!
//! # Custom amount
//! cargo run -p stayline-db --bin seed -- --bookings 200
//!
//! # Specify database path
//! cargo run -p stayline-db --bin seed -- --db ./data/stayline.db
//! ```
//!
//! ## Generated Data
//! - Hotel `h-1` and its property settings (GST 12 / 5 / 18)
//! - Room types rt-1..rt-4 (Deluxe, Double, Single, Dormitory)
//! - Channel connections MMT, Booking.com (connected) and Expedia
//! - Rate rules: weekend ×1.2 and a festival event two weeks out
//! - Demo reservations spread over the next 30 days, built by the booking
//!   engine so they never overbook

use std::env;

use chrono::{Duration, Utc};
use stayline_core::dates::FixedClock;
use stayline_core::money::Money;
use stayline_core::reservation::{create_reservation, ReservationRequest, ReservationRow};
use stayline_core::{
    BookingSource, ChannelConnection, ConnectionStatus, Hotel, Markup, PropertySettings, RateModifier, RateRules,
    RoomType, SpecialEvent, WeeklyRule,
};
use stayline_db::{Database, DbConfig};

/// (id, name, capacity, occupancy, base, floor, ceiling, extra bed, amenities, rooms)
type RoomTypeSeed = (&'static str, &'static str, u32, u32, i64, i64, i64, i64, &'static [&'static str], &'static [&'static str]);

const ROOM_TYPES: &[RoomTypeSeed] = &[
    (
        "rt-1",
        "Delux Room (AC)",
        10,
        2,
        4500,
        3000,
        8000,
        1200,
        &["WiFi", "AC", "TV"],
        &["101", "102", "103", "104", "105", "106", "107", "108", "109", "110"],
    ),
    (
        "rt-2",
        "Double Bed Room",
        10,
        2,
        2800,
        1800,
        5000,
        800,
        &["WiFi", "Fan"],
        &["201", "202", "203", "204", "205", "206", "207", "208", "209", "210"],
    ),
    (
        "rt-3",
        "Single Bed Room",
        5,
        1,
        1800,
        1200,
        3000,
        500,
        &["WiFi"],
        &["301", "302", "303", "304", "305"],
    ),
    (
        "rt-4",
        "Dormitory",
        3,
        1,
        1200,
        800,
        2500,
        300,
        &["WiFi", "Locker"],
        &["D-1", "D-2", "D-3"],
    ),
];

const GUESTS: &[&str] = &[
    "Asha Rao",
    "Vikram Singh",
    "Meera Iyer",
    "Rahul Verma",
    "Fatima Khan",
    "Arjun Nair",
    "Priya Das",
    "Kabir Mehta",
    "Sneha Kulkarni",
    "Rohan Gupta",
];

const SOURCES: &[BookingSource] = &[
    BookingSource::Direct,
    BookingSource::Mmt,
    BookingSource::Direct,
    BookingSource::BookingCom,
    BookingSource::Expedia,
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let mut count: usize = 40;
    let mut db_path = String::from("./stayline_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--bookings" | "-b" => {
                if i + 1 < args.len() {
                    count = args[i + 1].parse().unwrap_or(40);
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Stayline Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -b, --bookings <N>  Demo reservations to generate (default: 40)");
                println!("  -d, --db <PATH>     Database file path (default: ./stayline_dev.db)");
                println!("  -h, --help          Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 Stayline Seed Data Generator");
    println!("===============================");
    println!("Database: {}", db_path);
    println!("Bookings: {}", count);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;
    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    if !db.room_types().list().await?.is_empty() {
        println!("⚠ Database already has room types");
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    seed_property(&db).await?;
    println!("✓ Property and hotel saved");

    for rt in ROOM_TYPES.iter().map(room_type) {
        db.room_types().insert(&rt).await?;
    }
    println!("✓ {} room types", ROOM_TYPES.len());

    for connection in connections() {
        db.channels().upsert(&connection).await?;
    }
    println!("✓ Channel connections");

    db.rate_rules().put(&rate_rules()).await?;
    println!("✓ Rate rules");

    println!();
    println!("Generating reservations...");
    let start = std::time::Instant::now();
    let (created, skipped) = seed_bookings(&db, count).await?;

    println!();
    println!("✓ {} bookings in {:?} ({} requests found no room)", created, start.elapsed(), skipped);
    println!();
    println!("✓ Seed complete!");
    Ok(())
}

fn room_type(seed: &RoomTypeSeed) -> RoomType {
    let (id, name, capacity, occupancy, base, floor, ceiling, extra_bed, amenities, rooms) = *seed;
    RoomType {
        id: id.to_string(),
        name: name.to_string(),
        total_capacity: capacity,
        base_occupancy: occupancy,
        base_price: Money::from_major(base),
        floor_price: Money::from_major(floor),
        ceiling_price: Money::from_major(ceiling),
        extra_bed_charge: Money::from_major(extra_bed),
        amenities: amenities.iter().map(|s| s.to_string()).collect(),
        room_numbers: rooms.iter().map(|s| s.to_string()).collect(),
    }
}

fn connections() -> Vec<ChannelConnection> {
    vec![
        ChannelConnection {
            id: "mmt".to_string(),
            name: BookingSource::Mmt.label().to_string(),
            key: "mkmt_live_7d2f".to_string(),
            status: ConnectionStatus::Connected,
            markup: Some(Markup::Percentage { bps: 1000 }),
            is_stopped: false,
        },
        ChannelConnection {
            id: "booking".to_string(),
            name: BookingSource::BookingCom.label().to_string(),
            key: "bcom_auth_a11b".to_string(),
            status: ConnectionStatus::Connected,
            markup: Some(Markup::Percentage { bps: 1500 }),
            is_stopped: false,
        },
        ChannelConnection {
            id: "expedia".to_string(),
            name: BookingSource::Expedia.label().to_string(),
            key: String::new(),
            status: ConnectionStatus::Disconnected,
            markup: Some(Markup::Fixed {
                amount: Money::from_major(300),
            }),
            is_stopped: false,
        },
    ]
}

fn rate_rules() -> RateRules {
    let start = Utc::now().date_naive() + Duration::days(14);
    RateRules {
        weekly_rules: WeeklyRule {
            is_active: true,
            // Friday, Saturday
            active_days: vec![5, 6],
            modifier: RateModifier::Multiplier { bps: 12_000 },
        },
        special_events: vec![SpecialEvent {
            id: "ev-1".to_string(),
            name: "Festival Weekend".to_string(),
            start_date: start,
            end_date: start + Duration::days(2),
            modifier: RateModifier::Multiplier { bps: 15_000 },
        }],
    }
}

async fn seed_property(db: &Database) -> Result<(), Box<dyn std::error::Error>> {
    db.hotels()
        .upsert(&Hotel {
            id: "h-1".to_string(),
            name: "Hotel Satsangi".to_string(),
            location: "Deoghar".to_string(),
            color: "indigo".to_string(),
        })
        .await?;
    db.property()
        .put(&PropertySettings {
            name: "Hotel Satsangi".to_string(),
            address: "Tower Chowk, Deoghar, Jharkhand".to_string(),
            phone: Some("+91 6432 000000".to_string()),
            gst_number: Some("20AAAAA0000A1Z5".to_string()),
            ..Default::default()
        })
        .await?;
    Ok(())
}

/// Builds each reservation with the engine against the current store, so
/// the seeded grid is conflict-free. Returns (created, skipped).
async fn seed_bookings(db: &Database, count: usize) -> Result<(usize, usize), Box<dyn std::error::Error>> {
    let today = Utc::now().date_naive();
    let mut clock = FixedClock::new(Utc::now());
    let mut created = 0;
    let mut skipped = 0;

    for n in 0..count {
        let store = db.load_store().await?;
        let rt = &ROOM_TYPES[n % ROOM_TYPES.len()];
        let check_in = today + Duration::days(((n * 7) % 30) as i64);
        let nights = 1 + (n % 4) as i64;
        let rooms = 1 + usize::from(n % 6 == 0);

        let request = ReservationRequest {
            guest_name: GUESTS[n % GUESTS.len()].to_string(),
            phone_number: Some(format!("98{:08}", n * 7919 % 100_000_000)),
            email: None,
            guest_details: None,
            source: SOURCES[n % SOURCES.len()],
            special_requests: None,
            is_vip: n % 9 == 0,
            rooms: (0..rooms)
                .map(|_| ReservationRow {
                    room_type_id: rt.0.to_string(),
                    check_in,
                    check_out: check_in + Duration::days(nights),
                    room_number: None,
                    pax: Some(rt.3),
                    extra_beds: u32::from(n % 5 == 0),
                })
                .collect(),
        };

        // Ids embed the clock's millis; advance it so each batch is unique
        clock = clock.advanced(1);
        match create_reservation(&store, &request, &clock) {
            Ok(bookings) => {
                created += db.bookings().insert_bulk(&bookings).await?.len();
            }
            Err(e) => {
                skipped += 1;
                eprintln!("  Skipped {}: {}", request.guest_name, e);
            }
        }

        if (n + 1) % 10 == 0 {
            println!("  Generated {} reservations...", n + 1);
        }
    }
    Ok((created, skipped))
}
