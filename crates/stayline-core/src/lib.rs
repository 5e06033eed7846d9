//! # stayline-core: Booking & Billing Engine
//!
//! This crate is the **heart** of Stayline. It holds every booking, room
//! allocation and billing rule as pure functions with zero I/O.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Stayline Architecture                            │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    Front Desk UI                                │   │
//! │  │    Booking grid ──► New booking ──► Guest profile ──► Invoice   │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ commands                               │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │        stayline-sync (DeskHandle, reconciler, fan-out)          │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ stayline-core (THIS CRATE) ★                    │   │
//! │  │                                                                 │   │
//! │  │  availability  allocator  schedule  transfer  ledger  status    │   │
//! │  │  reservation   pricing    rates     frontdesk store command     │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │        stayline-db (SQLite)      stayline-api (REST server)     │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Booking, RoomType, FolioItem, Payment, ...)
//! - [`money`] - Integer paise and basis-point tax rates
//! - [`availability`] - Free rooms per type over a date range
//! - [`allocator`] - Concrete room assignment
//! - [`schedule`] - Drag-to-move and resize
//! - [`transfer`] - Full and mid-stay room transfers
//! - [`ledger`] - Folio, payments, balances, invoices
//! - [`rates`] - Weekly and special-event yield rules
//! - [`command`] - Optimistic commands and reconciliation
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: same store + same command + same clock = same result
//! 2. **No I/O**: time comes from a [`dates::Clock`], persistence from callers
//! 3. **Integer Money**: paise (i64) and basis points, never floats
//! 4. **Explicit Errors**: typed [`CoreError`], never panics
//!
//! ## Example Usage
//!
//! ```rust
//! use stayline_core::money::{Money, TaxRate};
//!
//! // Three nights at ₹1000, 12% room GST
//! let stay = Money::from_major(1000) * 3;
//! assert_eq!(stay.calculate_tax(TaxRate::from_percentage(12.0)), Money::from_major(360));
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod access;
pub mod allocator;
pub mod availability;
pub mod command;
pub mod dates;
pub mod error;
pub mod frontdesk;
pub mod ledger;
pub mod money;
pub mod pricing;
pub mod rates;
pub mod reservation;
pub mod schedule;
pub mod status;
pub mod store;
pub mod transfer;
pub mod types;
pub mod validation;

#[cfg(test)]
mod test_support;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use command::{apply, reconcile, Applied, Command, PendingPersist, PersistOp, PersistOutcome, Reconciliation};
pub use dates::{Clock, FixedClock, SystemClock};
pub use error::{CoreError, CoreResult, ValidationError};
pub use money::{Money, TaxRate};
pub use rates::{EffectiveRate, RateModifier, RateRules, SpecialEvent, WeeklyRule};
pub use store::BookingStore;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Rooms a single reservation may hold.
pub const MAX_ROOMS_PER_RESERVATION: usize = 10;

/// Longest accepted guest name.
pub const MAX_GUEST_NAME_LEN: usize = 100;

/// Permission level needed to read unmasked guest identity numbers.
pub const PII_REVEAL_LEVEL: u8 = 2;
