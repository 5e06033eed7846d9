//! # Money Module
//!
//! Provides the `Money` type for tariffs, folio charges and payments, and
//! `TaxRate` for GST slabs.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  A channel quotes ₹10,000.00 for 3 nights:                              │
//! │    10000 / 3 = 3333.333...  and 3333.33 × 3 = 9999.99  → lost ₹0.01   │
//! │                                                                         │
//! │  An inclusive ₹590.00 F&B bill at 5% GST:                               │
//! │    590 / 1.05 = 561.9047619...                                          │
//! │                                                                         │
//! │  OUR SOLUTION: Integer paise                                            │
//! │    Every division rounds half-up ONCE, at a known place, and the        │
//! │    remainder is assigned explicitly (tax = amount - base).              │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use stayline_core::money::{Money, TaxRate};
//!
//! let tariff = Money::from_major(4500);
//! let stay = tariff * 3;
//! assert_eq!(stay.minor(), 1_350_000);
//!
//! let (base, tax) = Money::from_major(590).split_inclusive(TaxRate::from_percentage(5.0));
//! assert_eq!(base.minor(), 56_190);
//! assert_eq!(tax.minor(), 2_810);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};
use ts_rs::TS;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in the smallest currency unit (paise for INR).
///
/// ## Where Money is Used
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │                                                                         │
/// │  RoomType.base_price ──► nightly rate ──► room base total ──┐           │
/// │  Booking.amount (channel quote) ────────────────────────────┤           │
/// │  FolioItem.amount ──────────────────────────────────────────┼─► bill    │
/// │  Payment.amount ───────────────────────────► total payments ┘           │
/// │                                                                         │
/// │  bill - payments = net outstanding (gates checkout)                     │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(transparent)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from paise.
    #[inline]
    pub const fn from_minor(minor: i64) -> Self {
        Money(minor)
    }

    /// Creates a Money value from whole rupees.
    ///
    /// ## Example
    /// ```rust
    /// use stayline_core::money::Money;
    ///
    /// assert_eq!(Money::from_major(1200).minor(), 120_000);
    /// ```
    #[inline]
    pub const fn from_major(major: i64) -> Self {
        Money(major * 100)
    }

    /// Returns the value in paise.
    #[inline]
    pub const fn minor(&self) -> i64 {
        self.0
    }

    /// Returns the whole-rupee portion (truncated toward zero).
    #[inline]
    pub const fn major(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the paise portion (always 0-99).
    #[inline]
    pub const fn minor_part(&self) -> i64 {
        (self.0 % 100).abs()
    }

    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    #[inline]
    pub const fn abs(&self) -> Self {
        Money(self.0.abs())
    }

    /// Tax on a tax-exclusive amount, rounded half-up to the nearest paisa.
    ///
    /// ## Implementation
    /// `(amount * bps + 5000) / 10000` in i128 so large folios cannot overflow.
    ///
    /// ## Example
    /// ```rust
    /// use stayline_core::money::{Money, TaxRate};
    ///
    /// let room = Money::from_major(3000);
    /// assert_eq!(room.calculate_tax(TaxRate::from_percentage(12.0)).minor(), 36_000);
    /// ```
    pub fn calculate_tax(&self, rate: TaxRate) -> Money {
        self.percentage_of(rate.bps())
    }

    /// Splits a tax-inclusive amount into `(base, tax)`.
    ///
    /// `base = amount / (1 + rate)` rounded half-up, and `tax = amount - base`
    /// so the two parts always add back to the original amount.
    pub fn split_inclusive(&self, rate: TaxRate) -> (Money, Money) {
        let divisor = 10_000i128 + rate.bps() as i128;
        let scaled = self.0 as i128 * 10_000;
        let base = div_round_half_up(scaled, divisor) as i64;
        (Money(base), Money(self.0 - base))
    }

    /// `bps / 10000` of this amount, rounded half-up.
    pub fn percentage_of(&self, bps: u32) -> Money {
        Money(div_round_half_up(self.0 as i128 * bps as i128, 10_000) as i64)
    }

    /// Divides evenly into `parts`, rounding half-up. Returns zero for zero parts.
    ///
    /// ## Example
    /// ```rust
    /// use stayline_core::money::Money;
    ///
    /// // A channel total of ₹10,000 spread over 3 nights
    /// assert_eq!(Money::from_major(10_000).divide_by(3).minor(), 333_333);
    /// ```
    pub fn divide_by(&self, parts: i64) -> Money {
        if parts == 0 {
            return Money::zero();
        }
        Money(div_round_half_up(self.0 as i128, parts as i128) as i64)
    }

    /// Splits into two halves that always sum to `self` (CGST/SGST).
    /// The first half takes the odd paisa.
    pub fn halves(&self) -> (Money, Money) {
        let second = self.0 / 2;
        (Money(self.0 - second), Money(second))
    }

    /// Rounds half-up to whole rupees (sell rates are quoted without paise).
    pub fn round_to_major(&self) -> Money {
        Money(div_round_half_up(self.0 as i128, 100) as i64 * 100)
    }
}

fn div_round_half_up(numerator: i128, denominator: i128) -> i128 {
    let (n, d) = if denominator < 0 {
        (-numerator, -denominator)
    } else {
        (numerator, denominator)
    };
    if n >= 0 {
        (n * 2 + d) / (d * 2)
    } else {
        -((-n * 2 + d) / (d * 2))
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Debug-friendly rendering; the UI formats amounts itself.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}₹{}.{:02}", sign, self.major().abs(), self.minor_part())
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

/// Multiplication by a night or bed count.
impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        Money(self.0 * qty)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), Add::add)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

// =============================================================================
// Tax Rate
// =============================================================================

/// Tax rate in basis points (bps).
///
/// 1 basis point = 0.01%, so the 12% room GST slab is `1200`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TaxRate(u32);

impl TaxRate {
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        TaxRate(bps)
    }

    /// Creates a tax rate from a percentage such as `12.0` or `2.5`.
    /// Negative or non-finite input yields a zero rate.
    pub fn from_percentage(pct: f64) -> Self {
        if !pct.is_finite() || pct <= 0.0 {
            return TaxRate(0);
        }
        TaxRate((pct * 100.0).round() as u32)
    }

    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Returns the rate as a percentage (for display only).
    #[inline]
    pub fn percentage(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// Half of this rate, as printed on CGST/SGST lines.
    #[inline]
    pub const fn half(&self) -> TaxRate {
        TaxRate(self.0 / 2)
    }

    #[inline]
    pub const fn zero() -> Self {
        TaxRate(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl Default for TaxRate {
    fn default() -> Self {
        TaxRate::zero()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
