//! # Rate Rules
//!
//! Yield rules that turn a room type's base price into the sell rate for
//! one date.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  effective rate for (room type, date)                                   │
//! │                                                                         │
//! │  1. dated manual RateUpdate for the type?  → its price, as entered      │
//! │  2. special event covering the date?       → event modifier             │
//! │     (first match in list order; start and end both inclusive)           │
//! │  3. weekly rule active on this weekday?    → weekly modifier            │
//! │  4. otherwise                              → base price                 │
//! │                                                                         │
//! │  Rule-priced results are clamped to [floor_price, ceiling_price] and    │
//! │  rounded half-up to whole rupees.                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Modifiers are either a multiplier in basis points (`12000` = ×1.2) or a
//! fixed amount added to the base price (negative for a discount).

use std::collections::HashSet;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreResult, ValidationError};
use crate::money::Money;
use crate::store::BookingStore;
use crate::types::RoomType;

/// Rule name reported for a daily price entered by hand.
pub const MANUAL_OVERRIDE: &str = "Manual Override";

/// Rule name reported when the weekly rule priced the date.
pub const WEEKLY_RULE: &str = "Weekly Strategy";

/// How a rule changes the base price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(tag = "type", rename_all = "snake_case")]
#[ts(export)]
pub enum RateModifier {
    /// Basis points of the base price (12000 = ×1.2).
    Multiplier { bps: u32 },
    Fixed { amount: Money },
}

impl RateModifier {
    pub fn apply(&self, base: Money) -> Money {
        match self {
            RateModifier::Multiplier { bps } => base.percentage_of(*bps),
            RateModifier::Fixed { amount } => base + *amount,
        }
    }
}

/// Modifier applied on selected weekdays.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct WeeklyRule {
    pub is_active: bool,
    /// 0 = Sunday … 6 = Saturday.
    pub active_days: Vec<u8>,
    pub modifier: RateModifier,
}

impl Default for WeeklyRule {
    fn default() -> Self {
        WeeklyRule {
            is_active: false,
            active_days: Vec::new(),
            modifier: RateModifier::Multiplier { bps: 10_000 },
        }
    }
}

impl WeeklyRule {
    fn applies_on(&self, date: NaiveDate) -> bool {
        let day = date.weekday().num_days_from_sunday() as u8;
        self.is_active && self.active_days.contains(&day)
    }
}

/// A dated modifier (festival, long weekend). Overrides the weekly rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct SpecialEvent {
    pub id: String,
    pub name: String,
    #[ts(as = "String")]
    pub start_date: NaiveDate,
    /// Inclusive.
    #[ts(as = "String")]
    pub end_date: NaiveDate,
    pub modifier: RateModifier,
}

impl SpecialEvent {
    pub fn covers(&self, date: NaiveDate) -> bool {
        self.start_date <= date && date <= self.end_date
    }
}

/// The property's yield configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct RateRules {
    #[serde(default)]
    pub weekly_rules: WeeklyRule,
    #[serde(default)]
    pub special_events: Vec<SpecialEvent>,
}

/// Sell rate for one date and the rule that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct EffectiveRate {
    #[ts(as = "String")]
    pub date: NaiveDate,
    pub room_type_id: String,
    pub price: Money,
    pub applied_rule: Option<String>,
}

impl RateRules {
    pub fn validate(&self) -> CoreResult<()> {
        if let Some(day) = self.weekly_rules.active_days.iter().find(|d| **d > 6) {
            return Err(ValidationError::OutOfRange {
                field: format!("activeDays ({day})"),
                min: 0,
                max: 6,
            }
            .into());
        }
        validate_modifier("weeklyRules.modifier", &self.weekly_rules.modifier)?;

        let mut seen = HashSet::new();
        for event in &self.special_events {
            validate_required("event id", &event.id)?;
            validate_required("event name", &event.name)?;
            if !seen.insert(event.id.as_str()) {
                return Err(ValidationError::Duplicate {
                    field: "event id".to_string(),
                    value: event.id.clone(),
                }
                .into());
            }
            if event.end_date < event.start_date {
                return Err(ValidationError::InvalidDateRange {
                    check_in: event.start_date.to_string(),
                    check_out: event.end_date.to_string(),
                }
                .into());
            }
            validate_modifier(&event.name, &event.modifier)?;
        }
        Ok(())
    }

    /// The rule-driven rate, ignoring manual overrides.
    pub fn rule_rate(&self, room_type: &RoomType, date: NaiveDate) -> (Money, Option<String>) {
        let base = room_type.base_price;
        let (raw, rule) = match self.special_events.iter().find(|e| e.covers(date)) {
            Some(event) => (event.modifier.apply(base), Some(event.name.clone())),
            None if self.weekly_rules.applies_on(date) => {
                (self.weekly_rules.modifier.apply(base), Some(WEEKLY_RULE.to_string()))
            }
            None => (base, None),
        };
        // Floor wins when a room type's bounds are inverted
        let clamped = raw.min(room_type.ceiling_price).max(room_type.floor_price);
        (clamped.round_to_major(), rule)
    }
}

fn validate_required(field: &str, value: &str) -> CoreResult<()> {
    if value.trim().is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        }
        .into());
    }
    Ok(())
}

fn validate_modifier(field: &str, modifier: &RateModifier) -> CoreResult<()> {
    if let RateModifier::Multiplier { bps: 0 } = modifier {
        return Err(ValidationError::MustBePositive {
            field: field.to_string(),
        }
        .into());
    }
    Ok(())
}

/// Sell rate of `room_type` on `date`: a dated manual rate update wins
/// (latest first), otherwise the store's rate rules.
pub fn effective_rate(store: &BookingStore, room_type: &RoomType, date: NaiveDate) -> EffectiveRate {
    let manual = store
        .rate_updates()
        .filter(|u| u.room_type_id == room_type.id && u.date == Some(date))
        .max_by_key(|u| u.timestamp);

    let (price, applied_rule) = match manual {
        Some(update) => (
            update.new_price,
            Some(
                update
                    .rule_applied
                    .clone()
                    .unwrap_or_else(|| MANUAL_OVERRIDE.to_string()),
            ),
        ),
        None => store.rate_rules().rule_rate(room_type, date),
    };

    EffectiveRate {
        date,
        room_type_id: room_type.id.clone(),
        price,
        applied_rule,
    }
}

/// One [`EffectiveRate`] per night of `[from, to)`.
pub fn rate_calendar(store: &BookingStore, room_type: &RoomType, from: NaiveDate, to: NaiveDate) -> Vec<EffectiveRate> {
    from.iter_days()
        .take_while(|day| *day < to)
        .map(|day| effective_rate(store, room_type, day))
        .collect()
}
