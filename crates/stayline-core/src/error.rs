//! # Error Types
//!
//! Domain-specific error types for stayline-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  stayline-core errors (this file)                                       │
//! │  ├── CoreError        - Business rule violations                       │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  stayline-db errors    └── DbError    - Database failures               │
//! │  stayline-sync errors  └── SyncError  - Persistence / fan-out failures  │
//! │  front-desk-api        └── ApiError   - What the UI sees (JSON)         │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → ApiError → Frontend               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every variant is recoverable. The caller shows a message and the prior
//! state stays usable; nothing in this crate panics on bad input.

use thiserror::Error;

use crate::money::Money;
use crate::types::BookingStatus;

// =============================================================================
// Core Error
// =============================================================================

/// Booking engine errors.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Booking not found: {0}")]
    BookingNotFound(String),

    #[error("Room type not found: {0}")]
    RoomTypeNotFound(String),

    /// A room number that no room type lists.
    #[error("Room not found: {0}")]
    RoomNotFound(String),

    #[error("Folio item not found: {0}")]
    FolioItemNotFound(String),

    #[error("Payment not found: {0}")]
    PaymentNotFound(String),

    /// Optimistic-lock conflict.
    ///
    /// ## When This Occurs
    /// ```text
    /// Clerk A opens booking (timestamp = 100)
    /// Clerk B edits booking   → timestamp = 140
    /// Clerk A drops the drag  → expected 100, live 140
    ///      │
    ///      ▼
    /// StaleVersion (never auto-merged; the UI asks for a refresh)
    /// ```
    #[error("This booking was modified by another user. Please refresh. ({booking_id}: expected version {expected}, found {actual})")]
    StaleVersion {
        booking_id: String,
        expected: i64,
        actual: i64,
    },

    /// No room of the type is free for every night of the requested stay.
    #[error("No {room_type_id} rooms available from {check_in} to {check_out}")]
    AvailabilityConflict {
        room_type_id: String,
        check_in: String,
        check_out: String,
    },

    /// The target room is already held by another booking.
    #[error("Room {room_number} is occupied by booking {conflicting_booking_id} for the requested dates")]
    RoomConflict {
        room_number: String,
        conflicting_booking_id: String,
    },

    /// Room inventory change would strand an active booking.
    #[error("Room {room_number} is held by active booking {booking_id}")]
    RoomInUse {
        room_number: String,
        booking_id: String,
    },

    /// Checkout attempted with money still owed. A business rule, not a fault.
    #[error("Checkout blocked: {outstanding} outstanding on booking {booking_id}")]
    CheckoutBlocked {
        booking_id: String,
        outstanding: Money,
    },

    #[error("Booking {booking_id} cannot move from {from:?} to {to:?}")]
    InvalidStatusTransition {
        booking_id: String,
        from: BookingStatus,
        to: BookingStatus,
    },

    /// Payments only leave `Completed`; refunded or cancelled ones are final.
    #[error("Payment {payment_id} is already {current}")]
    InvalidPaymentTransition {
        payment_id: String,
        current: String,
    },

    #[error("A reservation may hold at most {max} rooms (requested {requested})")]
    BatchTooLarge { max: usize, requested: usize },

    /// Transfer effective date outside `[check_in, check_out)`.
    #[error("Transfer date {effective_date} is outside the stay {check_in}..{check_out}")]
    InvalidTransferDate {
        effective_date: String,
        check_in: String,
        check_out: String,
    },

    #[error("Permission denied: {action} requires level {required}")]
    PermissionDenied { action: String, required: u8 },

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// True for optimistic-lock conflicts, which the UI reports distinctly.
    pub fn is_lock_conflict(&self) -> bool {
        matches!(self, CoreError::StaleVersion { .. })
    }

    /// Every engine error leaves prior state usable; only a permission
    /// failure needs someone else to act.
    pub fn is_user_recoverable(&self) -> bool {
        !matches!(self, CoreError::PermissionDenied { .. })
    }

    /// True when the server (or a refresh) is the only way to resolve it.
    pub fn requires_refresh(&self) -> bool {
        matches!(
            self,
            CoreError::StaleVersion { .. }
                | CoreError::AvailabilityConflict { .. }
                | CoreError::RoomConflict { .. }
        )
    }

    /// Stable machine-readable code for API responses.
    pub fn code(&self) -> &'static str {
        match self {
            CoreError::BookingNotFound(_)
            | CoreError::RoomTypeNotFound(_)
            | CoreError::RoomNotFound(_)
            | CoreError::FolioItemNotFound(_)
            | CoreError::PaymentNotFound(_) => "NOT_FOUND",
            CoreError::StaleVersion { .. } => "STALE_VERSION",
            CoreError::AvailabilityConflict { .. } => "AVAILABILITY_CONFLICT",
            CoreError::RoomConflict { .. } => "ROOM_CONFLICT",
            CoreError::RoomInUse { .. } => "ROOM_IN_USE",
            CoreError::CheckoutBlocked { .. } => "CHECKOUT_BLOCKED",
            CoreError::InvalidStatusTransition { .. } => "INVALID_STATUS_TRANSITION",
            CoreError::InvalidPaymentTransition { .. } => "INVALID_PAYMENT_TRANSITION",
            CoreError::BatchTooLarge { .. } => "BATCH_TOO_LARGE",
            CoreError::InvalidTransferDate { .. } => "INVALID_TRANSFER_DATE",
            CoreError::PermissionDenied { .. } => "PERMISSION_DENIED",
            CoreError::Validation(_) => "VALIDATION_ERROR",
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Caught before submission and never sent to the server.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("{field} is required")]
    Required { field: String },

    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g. a date that is not `YYYY-MM-DD`).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// `check_in` is not strictly before `check_out`.
    #[error("check-in {check_in} must be before check-out {check_out}")]
    InvalidDateRange { check_in: String, check_out: String },

    /// Duplicate value (e.g. the same room number twice).
    #[error("{field} '{value}' already exists")]
    Duplicate { field: String, value: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
