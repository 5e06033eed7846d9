//! # Calendar Dates
//!
//! Stays are measured in whole calendar days. A booking occupies the
//! half-open range `[check_in, check_out)`: the guest sleeps in the room on
//! `check_in` and leaves on the morning of `check_out`.
//!
//! ```text
//!   Jun 01    Jun 02    Jun 03    Jun 04
//!   ├─────────┼─────────┼─────────┤
//!   │ night 1 │ night 2 │ night 3 │  check_in = 06-01, check_out = 06-04
//!   └─────────┴─────────┴─────────┘
//!                                 ▲ not occupied: another guest may arrive
//! ```
//!
//! All arithmetic uses `NaiveDate`, never timestamps, so nothing here can
//! drift across a DST change or a timezone boundary.

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, Utc};

use crate::validation::ValidationResult;
use crate::error::ValidationError;

/// Wire format for stay dates.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Parses a `YYYY-MM-DD` calendar date.
pub fn parse_date(field: &str, value: &str) -> ValidationResult<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT).map_err(|e| {
        ValidationError::InvalidFormat {
            field: field.to_string(),
            reason: format!("expected YYYY-MM-DD ({e})"),
        }
    })
}

/// Billable nights between two dates, never less than one.
///
/// Same-day or inverted ranges still bill a single night.
pub fn billable_nights(check_in: NaiveDate, check_out: NaiveDate) -> i64 {
    (check_out - check_in).num_days().max(1)
}

// =============================================================================
// Stay Range
// =============================================================================

/// A validated half-open date range `[start, end)` with `start < end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StayRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl StayRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> ValidationResult<Self> {
        if start >= end {
            return Err(ValidationError::InvalidDateRange {
                check_in: start.to_string(),
                check_out: end.to_string(),
            });
        }
        Ok(StayRange { start, end })
    }

    /// Parses both ends from the wire format and validates the order.
    pub fn parse(check_in: &str, check_out: &str) -> ValidationResult<Self> {
        let start = parse_date("check_in", check_in)?;
        let end = parse_date("check_out", check_out)?;
        StayRange::new(start, end)
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn nights(&self) -> i64 {
        (self.end - self.start).num_days()
    }

    pub fn contains(&self, day: NaiveDate) -> bool {
        self.start <= day && day < self.end
    }

    /// Half-open overlap: `a.start < b.end && a.end > b.start`.
    pub fn overlaps(&self, start: NaiveDate, end: NaiveDate) -> bool {
        self.start < end && self.end > start
    }

    /// Every night of the stay, in order.
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> {
        let end = self.end;
        self.start.iter_days().take_while(move |d| *d < end)
    }
}

/// Whether two half-open ranges share at least one night.
pub fn ranges_overlap(a_start: NaiveDate, a_end: NaiveDate, b_start: NaiveDate, b_end: NaiveDate) -> bool {
    a_start < b_end && a_end > b_start
}

// =============================================================================
// Clock
// =============================================================================

/// Source of "now" for every mutation.
///
/// Commands never read the system clock directly; the engine stays
/// deterministic under test by swapping in a [`FixedClock`].
pub trait Clock: Send + Sync {
    /// Current instant.
    fn now(&self) -> DateTime<Utc>;

    /// Front-desk wall clock (arrival/departure stamps, "today").
    fn local_now(&self) -> NaiveDateTime;

    fn now_millis(&self) -> i64 {
        self.now().timestamp_millis()
    }

    fn today(&self) -> NaiveDate {
        self.local_now().date()
    }
}

/// The real clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn local_now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// A clock frozen at one instant, with the local wall clock equal to UTC.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock {
    now: DateTime<Utc>,
}

impl FixedClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        FixedClock { now }
    }

    /// Noon UTC on the given day.
    pub fn on(day: NaiveDate) -> Self {
        let noon = day.and_hms_opt(12, 0, 0).unwrap_or_default();
        FixedClock { now: noon.and_utc() }
    }

    /// Returns a copy advanced by `millis`.
    pub fn advanced(&self, millis: i64) -> Self {
        FixedClock {
            now: self.now + chrono::Duration::milliseconds(millis),
        }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.now
    }

    fn local_now(&self) -> NaiveDateTime {
        self.now.naive_utc()
    }
}
