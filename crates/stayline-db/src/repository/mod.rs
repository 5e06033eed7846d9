//! # Repository Module
//!
//! Database repository implementations for Stayline.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern                                   │
//! │                                                                         │
//! │  API handler / sync backend                                            │
//! │       │                                                                 │
//! │       │  db.bookings().insert_bulk(&rows)                              │
//! │       ▼                                                                 │
//! │  BookingRepository                                                     │
//! │  ├── loads the engine view (inventory, bookings, channels, settings)   │
//! │  ├── asks stayline-core whether the write is allowed                   │
//! │  └── writes inside the same transaction                                │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! │                                                                         │
//! │  The engine is the only place booking rules live; repositories never   │
//! │  re-implement availability or ledger arithmetic in SQL.                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`hotel::HotelRepository`] - Property switcher entries
//! - [`room_type::RoomTypeRepository`] - Inventory maintenance
//! - [`booking::BookingRepository`] - Bookings, transfers, checkout, history
//! - [`channel::ChannelRepository`] - OTA connections
//! - [`property::PropertyRepository`] - Property profile and GST slabs
//! - [`rate_rules::RateRulesRepository`] - Weekly strategy and special events
//! - [`guest::GuestRepository`] - Returning-guest profiles

pub mod booking;
pub mod channel;
pub mod guest;
pub mod hotel;
pub mod property;
pub mod rate_rules;
pub mod room_type;

use chrono::Utc;
use sqlx::SqliteConnection;
use stayline_core::BookingStore;

use crate::error::{DbError, DbResult};

/// RFC 3339 stamp for `created_at` / `updated_at` columns.
pub(crate) fn now_text() -> String {
    Utc::now().to_rfc3339()
}

/// Narrows an INTEGER column to `u32`.
pub(crate) fn to_u32(field: &str, value: i64) -> DbResult<u32> {
    u32::try_from(value).map_err(|_| DbError::Internal(format!("{field} out of range: {value}")))
}

/// The store the booking engine validates writes against, read on `conn`
/// so a transaction sees its own snapshot.
pub(crate) async fn load_engine_view(conn: &mut SqliteConnection) -> DbResult<BookingStore> {
    let room_types = room_type::fetch_all(conn).await?;
    let bookings = booking::fetch_all(conn).await?;
    let connections = channel::fetch_all(conn).await?;
    let property = property::fetch(conn).await?;
    let rules = rate_rules::fetch(conn).await?;

    let mut store = BookingStore::new(room_types)
        .with_connections(connections)
        .with_property(property)
        .with_rate_rules(rules);
    store.replace_bookings(bookings);
    Ok(store)
}
