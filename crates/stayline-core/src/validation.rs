//! # Validation Module
//!
//! Input checks that run before any state changes or network call.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Front desk UI                                                 │
//! │  └── Inline form feedback                                               │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Engine commands (Rust)                                        │
//! │  └── THIS MODULE: names, room identifiers, amounts, batch size          │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                             │
//! │  └── NOT NULL / PRIMARY KEY / FOREIGN KEY                               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::HashSet;

use crate::error::ValidationError;
use crate::money::Money;
use crate::types::RoomType;
use crate::{MAX_GUEST_NAME_LEN, MAX_ROOMS_PER_RESERVATION};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Validates a guest name: non-blank and at most [`MAX_GUEST_NAME_LEN`] chars.
pub fn validate_guest_name(name: &str) -> ValidationResult<()> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ValidationError::Required {
            field: "guest_name".to_string(),
        });
    }
    if name.chars().count() > MAX_GUEST_NAME_LEN {
        return Err(ValidationError::TooLong {
            field: "guest_name".to_string(),
            max: MAX_GUEST_NAME_LEN,
        });
    }
    Ok(())
}

/// Payments and charges must be strictly positive.
pub fn validate_positive_amount(field: &str, amount: Money) -> ValidationResult<()> {
    if !amount.is_positive() {
        return Err(ValidationError::MustBePositive {
            field: field.to_string(),
        });
    }
    Ok(())
}

/// A reservation holds between 1 and [`MAX_ROOMS_PER_RESERVATION`] rooms.
pub fn validate_batch_size(rooms: usize) -> ValidationResult<()> {
    if rooms == 0 || rooms > MAX_ROOMS_PER_RESERVATION {
        return Err(ValidationError::OutOfRange {
            field: "rooms".to_string(),
            min: 1,
            max: MAX_ROOMS_PER_RESERVATION as i64,
        });
    }
    Ok(())
}

/// Validates a room type's shape and its room identifiers against the rest
/// of the inventory.
///
/// ## Rules
/// - Name is required
/// - Capacity is positive; an explicit room list has exactly that many rooms
/// - Every room identifier is non-blank and unique, both within this type
///   and across `others` (a physical room belongs to one category)
///
/// `others` may include the type itself (matched by id); it is skipped.
pub fn validate_room_type(room_type: &RoomType, others: &[RoomType]) -> ValidationResult<()> {
    if room_type.name.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "name".to_string(),
        });
    }
    if room_type.total_capacity == 0 {
        return Err(ValidationError::MustBePositive {
            field: "total_capacity".to_string(),
        });
    }
    if room_type.base_price.is_negative() {
        return Err(ValidationError::MustBePositive {
            field: "base_price".to_string(),
        });
    }
    if !room_type.room_numbers.is_empty()
        && room_type.room_numbers.len() != room_type.total_capacity as usize
    {
        return Err(ValidationError::InvalidFormat {
            field: "room_numbers".to_string(),
            reason: format!(
                "{} rooms listed for a capacity of {}",
                room_type.room_numbers.len(),
                room_type.total_capacity
            ),
        });
    }

    let mut seen = HashSet::new();
    for room in room_type.room_numbers.iter() {
        let trimmed = room.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::Required {
                field: "room_number".to_string(),
            });
        }
        if !seen.insert(trimmed) {
            return Err(ValidationError::Duplicate {
                field: "room_number".to_string(),
                value: trimmed.to_string(),
            });
        }
    }

    let own_rooms = room_type.rooms();
    for other in others.iter().filter(|o| o.id != room_type.id) {
        if let Some(clash) = other.rooms().iter().find(|r| own_rooms.contains(r)) {
            return Err(ValidationError::Duplicate {
                field: "room_number".to_string(),
                value: clash.clone(),
            });
        }
    }
    Ok(())
}
