//! # Domain Types
//!
//! Core domain entities for Stayline.
//!
//! ## Entity Relationships
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Entity Relationship Diagram                        │
//! │                                                                         │
//! │  ┌──────────────┐        ┌──────────────┐        ┌──────────────┐      │
//! │  │   RoomType   │ 1    * │   Booking    │ 1    * │  FolioItem   │      │
//! │  │──────────────│◄───────│──────────────│───────►│──────────────│      │
//! │  │ id           │        │ id           │        │ id           │      │
//! │  │ room_numbers │        │ room_number? │        │ amount       │      │
//! │  │ base_price   │        │ check_in/out │        │ is_paid      │      │
//! │  └──────────────┘        │ timestamp ◄──┼─ version│ payment_id ──┼──┐   │
//! │                          │ reservation? │        └──────────────┘  │   │
//! │                          └──────┬───────┘                          │   │
//! │                                 │ 1    *   ┌──────────────┐        │   │
//! │                                 └─────────►│   Payment    │◄───────┘   │
//! │                                            │ status       │            │
//! │                                            └──────────────┘            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Wire Format
//! JSON field names are camelCase to match the front desk UI. Money is an
//! integer amount of paise; stay dates are `YYYY-MM-DD`.

use std::borrow::Cow;
use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::dates::{billable_nights, ranges_overlap};
use crate::money::{Money, TaxRate};

// =============================================================================
// Booking Status
// =============================================================================

/// Lifecycle state of a booking. See [`crate::status`] for the transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[ts(export)]
pub enum BookingStatus {
    Confirmed,
    CheckedIn,
    CheckedOut,
    Cancelled,
    /// A manual "payment warning" flag, not a hard rejection.
    Rejected,
}

impl BookingStatus {
    /// Statuses that hold a physical room for their dates.
    ///
    /// Availability, allocation and conflict checks all count only these.
    #[inline]
    pub fn occupies_room(&self) -> bool {
        matches!(self, BookingStatus::Confirmed | BookingStatus::CheckedIn)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Confirmed => "Confirmed",
            BookingStatus::CheckedIn => "CheckedIn",
            BookingStatus::CheckedOut => "CheckedOut",
            BookingStatus::Cancelled => "Cancelled",
            BookingStatus::Rejected => "Rejected",
        }
    }
}

// =============================================================================
// Booking Source
// =============================================================================

/// Where a booking came from: the front desk or an OTA channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[ts(export)]
pub enum BookingSource {
    Direct,
    #[serde(rename = "MMT")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "MMT"))]
    Mmt,
    #[serde(rename = "Booking.com")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "Booking.com"))]
    BookingCom,
    Expedia,
}

impl BookingSource {
    /// Display label, also the channel connection name.
    pub fn label(&self) -> &'static str {
        match self {
            BookingSource::Direct => "Direct",
            BookingSource::Mmt => "MMT",
            BookingSource::BookingCom => "Booking.com",
            BookingSource::Expedia => "Expedia",
        }
    }

    /// Lowercase alphanumeric slug used in booking ids ("bookingcom").
    pub fn slug(&self) -> String {
        self.label()
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .map(|c| c.to_ascii_lowercase())
            .collect()
    }

    #[inline]
    pub fn is_direct(&self) -> bool {
        matches!(self, BookingSource::Direct)
    }
}

// =============================================================================
// Guest Details
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub enum IdType {
    Aadhar,
    Passport,
    #[serde(rename = "Driving License")]
    DrivingLicense,
    #[serde(rename = "Voter ID")]
    VoterId,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub enum Gender {
    Male,
    Female,
    Other,
}

/// Identity and compliance record for a guest (GRC / Form C fields).
///
/// The clear `id_number` is private; see [`crate::access`] for how it is
/// revealed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase", default)]
#[ts(export)]
pub struct GuestDetails {
    pub name: Option<String>,
    pub phone_number: Option<String>,
    pub email: Option<String>,
    pub id_type: Option<IdType>,
    pub(crate) id_number: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub pin_code: Option<String>,
    pub country: Option<String>,
    pub nationality: Option<String>,
    pub gender: Option<Gender>,
    pub dob: Option<String>,
    pub father_or_husband_name: Option<String>,

    // Form C (foreign nationals)
    pub passport_number: Option<String>,
    pub passport_place_issue: Option<String>,
    pub passport_issue_date: Option<String>,
    pub passport_expiry: Option<String>,
    pub visa_number: Option<String>,
    pub visa_type: Option<String>,
    pub visa_place_issue: Option<String>,
    pub visa_issue_date: Option<String>,
    pub visa_expiry: Option<String>,
    pub arrived_from: Option<String>,
    pub arrival_date_india: Option<String>,
    pub arrival_port: Option<String>,
    pub next_destination: Option<String>,
    pub purpose_of_visit: Option<String>,
    pub is_form_c_submitted: Option<bool>,

    /// Stamped when the booking enters `CheckedIn` (`HH:MM`).
    pub arrival_time: Option<String>,
    /// Stamped when the booking enters `CheckedOut` (`HH:MM`).
    pub departure_time: Option<String>,
}

impl GuestDetails {
    /// Foreign nationals need a Form C registration.
    pub fn requires_form_c(&self) -> bool {
        let nationality = self.nationality.as_deref().unwrap_or("Indian");
        !nationality.trim().eq_ignore_ascii_case("indian")
    }

    /// Sets the identity document number.
    pub fn set_id_number(&mut self, id_number: impl Into<String>) {
        self.id_number = Some(id_number.into());
    }

    pub fn has_id_number(&self) -> bool {
        self.id_number.as_deref().is_some_and(|s| !s.is_empty())
    }
}

// =============================================================================
// Folio
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub enum FolioCategory {
    Room,
    #[serde(rename = "F&B")]
    FoodAndBeverage,
    Laundry,
    Other,
}

/// One charge line on a booking's folio.
///
/// Only `is_paid` and the payment linkage ever change in place. Corrections
/// are delete + recreate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct FolioItem {
    pub id: String,
    pub category: FolioCategory,
    pub description: String,
    pub amount: Money,
    /// `amount` already contains tax.
    #[serde(default)]
    pub is_inclusive: bool,
    #[ts(as = "String")]
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub is_paid: bool,
    #[serde(default)]
    pub payment_method: Option<PaymentMethod>,
    /// The payment currently covering this line.
    #[serde(default)]
    pub payment_id: Option<String>,
}

impl FolioItem {
    pub fn new(
        category: FolioCategory,
        description: impl Into<String>,
        amount: Money,
        is_inclusive: bool,
        timestamp: DateTime<Utc>,
    ) -> Self {
        FolioItem {
            id: format!("fi-{}", uuid::Uuid::new_v4()),
            category,
            description: description.into(),
            amount,
            is_inclusive,
            timestamp,
            is_paid: false,
            payment_method: None,
            payment_id: None,
        }
    }

    /// Clears `is_paid` and the payment linkage.
    pub fn mark_unpaid(&mut self) {
        self.is_paid = false;
        self.payment_method = None;
        self.payment_id = None;
    }
}

// =============================================================================
// Payment
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub enum PaymentMethod {
    Cash,
    #[serde(rename = "UPI")]
    Upi,
    Card,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub enum PaymentCategory {
    Room,
    Folio,
    Extra,
    Partial,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub enum PaymentStatus {
    Completed,
    Refunded,
    Cancelled,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Completed => "Completed",
            PaymentStatus::Refunded => "Refunded",
            PaymentStatus::Cancelled => "Cancelled",
        }
    }
}

/// One payment transaction against a booking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Payment {
    pub id: String,
    pub amount: Money,
    pub method: PaymentMethod,
    pub category: PaymentCategory,
    #[ts(as = "String")]
    pub timestamp: DateTime<Utc>,
    pub status: PaymentStatus,
    #[serde(default)]
    pub description: Option<String>,
}

impl Payment {
    pub fn completed(
        amount: Money,
        method: PaymentMethod,
        category: PaymentCategory,
        description: Option<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Payment {
            id: format!("pay-{}", uuid::Uuid::new_v4()),
            amount,
            method,
            category,
            timestamp,
            status: PaymentStatus::Completed,
            description,
        }
    }
}

// =============================================================================
// Room Type
// =============================================================================

/// An inventory category and its physical rooms.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct RoomType {
    pub id: String,
    pub name: String,
    pub total_capacity: u32,
    pub base_occupancy: u32,
    pub base_price: Money,
    #[serde(default)]
    pub floor_price: Money,
    #[serde(default)]
    pub ceiling_price: Money,
    #[serde(default)]
    pub extra_bed_charge: Money,
    #[serde(default)]
    pub amenities: Vec<String>,
    /// Explicit physical rooms, in allocation order. Empty means synthesized.
    #[serde(default)]
    pub room_numbers: Vec<String>,
}

impl RoomType {
    /// Physical rooms in allocation order.
    ///
    /// Without an explicit list, `total_capacity` rooms are synthesized as
    /// `{first two letters of the name, uppercased}-101`, `-102`, ...
    pub fn rooms(&self) -> Cow<'_, [String]> {
        if !self.room_numbers.is_empty() {
            return Cow::Borrowed(&self.room_numbers);
        }
        let prefix: String = self.name.chars().take(2).collect::<String>().to_uppercase();
        Cow::Owned(
            (0..self.total_capacity)
                .map(|i| format!("{}-{}", prefix, 101 + i))
                .collect(),
        )
    }

    pub fn has_room(&self, room_number: &str) -> bool {
        self.rooms().iter().any(|r| r == room_number)
    }
}

// =============================================================================
// Booking
// =============================================================================

/// The central entity: one room for one date range.
///
/// ## Invariants
/// - `check_in < check_out`
/// - While `status` occupies a room, no other occupying booking claims the
///   same `room_number` for any shared night (enforced by the engine at
///   allocation and mutation time, not by storage)
/// - `timestamp` is the optimistic-lock version; every mutation raises it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Booking {
    pub id: String,
    /// Groups the rooms of one multi-room reservation.
    #[serde(default)]
    pub reservation_id: Option<String>,
    pub room_type_id: String,
    #[serde(default)]
    pub room_number: Option<String>,
    pub guest_name: String,
    pub source: BookingSource,
    pub status: BookingStatus,
    /// Last-write epoch millis; the optimistic-lock version.
    pub timestamp: i64,
    #[ts(as = "String")]
    pub check_in: NaiveDate,
    #[ts(as = "String")]
    pub check_out: NaiveDate,
    /// Channel-quoted total (authoritative for non-direct sources).
    #[serde(default)]
    pub amount: Money,
    /// Nightly rate locked by a rate-keeping room transfer.
    #[serde(default)]
    pub rate_override: Option<Money>,
    #[serde(default)]
    pub channel_sync: BTreeMap<String, ChannelStatus>,
    #[serde(default)]
    pub guest_details: Option<GuestDetails>,
    #[serde(default)]
    pub accessory_guests: Vec<GuestDetails>,
    #[serde(default)]
    pub number_of_rooms: Option<u32>,
    #[serde(default)]
    pub pax: Option<u32>,
    #[serde(default)]
    pub extra_beds: u32,
    #[serde(default)]
    pub special_requests: Option<String>,
    #[serde(default)]
    pub rejection_reason: Option<String>,
    #[serde(default, rename = "isVIP")]
    pub is_vip: bool,
    #[serde(default)]
    pub is_settled: bool,
    #[serde(default)]
    pub folio: Vec<FolioItem>,
    #[serde(default)]
    pub payments: Vec<Payment>,
}

impl Booking {
    /// Billable nights, never less than one.
    pub fn nights(&self) -> i64 {
        billable_nights(self.check_in, self.check_out)
    }

    /// Whether this booking holds its room (see [`BookingStatus::occupies_room`]).
    #[inline]
    pub fn occupies_room(&self) -> bool {
        self.status.occupies_room()
    }

    /// Whether the stay shares at least one night with `[start, end)`.
    pub fn overlaps(&self, start: NaiveDate, end: NaiveDate) -> bool {
        ranges_overlap(self.check_in, self.check_out, start, end)
    }

    /// Whether the guest sleeps here on `day`.
    pub fn covers(&self, day: NaiveDate) -> bool {
        self.check_in <= day && day < self.check_out
    }

    pub fn folio_item(&self, item_id: &str) -> Option<&FolioItem> {
        self.folio.iter().find(|i| i.id == item_id)
    }

    pub fn payment(&self, payment_id: &str) -> Option<&Payment> {
        self.payments.iter().find(|p| p.id == payment_id)
    }

    /// Bumps the version. Strictly increasing even within one millisecond.
    pub fn touch(&mut self, now_millis: i64) {
        self.timestamp = now_millis.max(self.timestamp + 1);
    }
}

// =============================================================================
// Channels
// =============================================================================

/// Per-channel delivery status of one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum ChannelStatus {
    Pending,
    Success,
    Error,
    Retrying,
    WaitingRetry,
    /// Stop-sell is on for the channel; nothing was sent.
    Stopped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum ConnectionStatus {
    Connected,
    Disconnected,
    Testing,
}

/// Channel price adjustment over the room type's base price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(tag = "type", rename_all = "snake_case")]
#[ts(export)]
pub enum Markup {
    /// Basis points on top of the base price (1500 = +15%).
    Percentage { bps: u32 },
    Fixed { amount: Money },
}

/// An OTA distribution channel connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ChannelConnection {
    pub id: String,
    /// Matches [`BookingSource::label`] ("MMT", "Booking.com", ...).
    pub name: String,
    #[serde(default)]
    pub key: String,
    pub status: ConnectionStatus,
    #[serde(default)]
    pub markup: Option<Markup>,
    /// Stop-sell: fan-out reports `Stopped` without sending.
    #[serde(default)]
    pub is_stopped: bool,
}

impl ChannelConnection {
    pub fn is_connected(&self) -> bool {
        self.status == ConnectionStatus::Connected
    }
}

// =============================================================================
// Sync Events
// =============================================================================

/// A rate push to channels (the non-booking live event kind).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct RateUpdate {
    pub id: String,
    pub room_type_id: String,
    pub new_price: Money,
    #[serde(default)]
    #[ts(as = "Option<String>")]
    pub date: Option<NaiveDate>,
    pub timestamp: i64,
    #[serde(default)]
    pub channel_sync: BTreeMap<String, ChannelStatus>,
    #[serde(default)]
    pub channel_prices: BTreeMap<String, Money>,
    #[serde(default)]
    pub rule_applied: Option<String>,
}

/// Every live-updating entity the front desk tracks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(tag = "type", rename_all = "snake_case")]
#[ts(export)]
pub enum SyncEvent {
    Booking(Booking),
    RateUpdate(RateUpdate),
}

impl SyncEvent {
    pub fn id(&self) -> &str {
        match self {
            SyncEvent::Booking(b) => &b.id,
            SyncEvent::RateUpdate(r) => &r.id,
        }
    }

    pub fn kind(&self) -> EventKind {
        match self {
            SyncEvent::Booking(_) => EventKind::Booking,
            SyncEvent::RateUpdate(_) => EventKind::RateUpdate,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Booking,
    RateUpdate,
}

// =============================================================================
// Property & Guests
// =============================================================================

/// A property in the hotel switcher.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Hotel {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub location: String,
    /// UI accent colour name.
    #[serde(default)]
    pub color: String,
}

/// Property profile and GST slabs (percentages).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct PropertySettings {
    pub name: String,
    pub address: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub gst_number: Option<String>,
    #[serde(default = "default_gst_rate")]
    pub gst_rate: f64,
    #[serde(default = "default_food_gst_rate")]
    pub food_gst_rate: f64,
    #[serde(default = "default_other_gst_rate")]
    pub other_gst_rate: f64,
}

fn default_gst_rate() -> f64 {
    12.0
}

fn default_food_gst_rate() -> f64 {
    5.0
}

fn default_other_gst_rate() -> f64 {
    18.0
}

impl Default for PropertySettings {
    fn default() -> Self {
        PropertySettings {
            name: String::new(),
            address: String::new(),
            phone: None,
            email: None,
            gst_number: None,
            gst_rate: default_gst_rate(),
            food_gst_rate: default_food_gst_rate(),
            other_gst_rate: default_other_gst_rate(),
        }
    }
}

impl PropertySettings {
    pub fn room_tax_rate(&self) -> TaxRate {
        TaxRate::from_percentage(self.gst_rate)
    }

    /// GST slab for a folio line.
    pub fn folio_tax_rate(&self, category: FolioCategory) -> TaxRate {
        match category {
            FolioCategory::FoodAndBeverage => TaxRate::from_percentage(self.food_gst_rate),
            _ => TaxRate::from_percentage(self.other_gst_rate),
        }
    }
}

/// A returning-guest record keyed by phone number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct GuestProfile {
    #[serde(default)]
    pub id: Option<i64>,
    pub name: String,
    pub phone_number: String,
    #[serde(default)]
    pub id_type: Option<IdType>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub dob: Option<String>,
    #[serde(default)]
    pub nationality: Option<String>,
    #[serde(default)]
    pub preferences: Option<String>,
    #[serde(default)]
    #[ts(as = "Option<String>")]
    pub last_check_in: Option<NaiveDate>,
}
