//! # stayline-db: Database Layer for Stayline
//!
//! SQLite storage for the front desk server, through sqlx.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Stayline Data Flow                               │
//! │                                                                         │
//! │  REST handler (POST /api/bookings/bulk)                                │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                   stayline-db (THIS CRATE)                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌────────────────┐   ┌──────────────┐   │   │
//! │  │   │   Database    │    │  Repositories  │   │  Migrations  │   │   │
//! │  │   │   (pool.rs)   │◄───│ room_type      │   │  (embedded)  │   │   │
//! │  │   │               │    │ booking        │   │ 001_init.sql │   │   │
//! │  │   │  SqlitePool   │    │ channel guest  │   │              │   │   │
//! │  │   └───────────────┘    └───────┬────────┘   └──────────────┘   │   │
//! │  │                                │ re-validates through           │   │
//! │  │                                ▼                                │   │
//! │  │                         stayline-core                           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite file (WAL)                                                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use stayline_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("stayline.db")).await?;
//! let store = db.load_store().await?;
//! let history = db.bookings().guest_history(Some("Asha Rao"), None, None).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

#[cfg(test)]
pub(crate) mod test_fixtures;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

pub use repository::booking::BookingRepository;
pub use repository::channel::ChannelRepository;
pub use repository::guest::GuestRepository;
pub use repository::hotel::HotelRepository;
pub use repository::property::PropertyRepository;
pub use repository::rate_rules::RateRulesRepository;
pub use repository::room_type::RoomTypeRepository;
