//! # Folio & Payment Ledger
//!
//! Charges, payments and everything derived from them.
//!
//! ## Derived Quantities
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Recomputed on every read, never stored                                │
//! │                                                                         │
//! │  nights          = max(1, check_out - check_in)                         │
//! │  room_rate       = Direct: rate_override ?? room_type.base_price        │
//! │                    Channel: amount / nights                             │
//! │  room_base_total = Direct: room_rate × nights                           │
//! │                    Channel: amount                                      │
//! │  total_bill      = room_base_total + Σ folio.amount                     │
//! │  total_payments  = Σ completed payments NOT backing a paid folio line   │
//! │                  + Σ paid folio lines backed by a payment               │
//! │  net_outstanding = total_bill - total_payments   (> 0 blocks checkout)  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A payment that backs a paid folio line is counted once, through the
//! line. The link is bidirectional: refunding or cancelling that payment
//! returns the line to unpaid. Lines closed by the checkout settlement carry
//! no payment; the standalone payments already cover them, so they add
//! nothing to `total_payments`.

use std::collections::HashSet;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::{Money, TaxRate};
use crate::types::{
    Booking, FolioCategory, FolioItem, Payment, PaymentCategory, PaymentMethod, PaymentStatus,
    PropertySettings, RoomType,
};
use crate::validation::validate_positive_amount;

/// Description prefix that identifies the extra-bed folio line.
pub const EXTRA_BED_DESCRIPTION: &str = "Extra Bed Setup";

// =============================================================================
// Summary
// =============================================================================

/// Derived balance figures for one booking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct LedgerSummary {
    pub nights: i64,
    pub room_rate: Money,
    pub room_base_total: Money,
    pub unpaid_folio_total: Money,
    pub paid_folio_total: Money,
    pub total_payments: Money,
    pub total_bill: Money,
    pub net_outstanding: Money,
}

impl LedgerSummary {
    /// Checkout is allowed once nothing is owed.
    pub fn can_check_out(&self) -> bool {
        !self.net_outstanding.is_positive()
    }
}

/// Nightly room rate. `room_type` may be missing (deleted type); a direct
/// booking then prices at zero unless it carries a locked rate.
pub fn room_rate(booking: &Booking, room_type: Option<&RoomType>) -> Money {
    if booking.source.is_direct() {
        booking
            .rate_override
            .or_else(|| room_type.map(|rt| rt.base_price))
            .unwrap_or_default()
    } else {
        booking.amount.divide_by(booking.nights())
    }
}

pub fn room_base_total(booking: &Booking, room_type: Option<&RoomType>) -> Money {
    if booking.source.is_direct() {
        room_rate(booking, room_type) * booking.nights()
    } else {
        booking.amount
    }
}

/// Completed payments that do not back a paid folio line.
fn standalone_payments(booking: &Booking) -> Money {
    let linked: HashSet<&str> = booking
        .folio
        .iter()
        .filter(|i| i.is_paid)
        .filter_map(|i| i.payment_id.as_deref())
        .collect();
    booking
        .payments
        .iter()
        .filter(|p| p.status == PaymentStatus::Completed)
        .filter(|p| !linked.contains(p.id.as_str()))
        .map(|p| p.amount)
        .sum()
}

pub fn summarize(booking: &Booking, room_type: Option<&RoomType>) -> LedgerSummary {
    let room_base_total = room_base_total(booking, room_type);
    let paid_folio_total: Money = booking.folio.iter().filter(|i| i.is_paid).map(|i| i.amount).sum();
    let unpaid_folio_total: Money = booking.folio.iter().filter(|i| !i.is_paid).map(|i| i.amount).sum();
    let backed_folio_total: Money = booking
        .folio
        .iter()
        .filter(|i| i.is_paid && i.payment_id.is_some())
        .map(|i| i.amount)
        .sum();
    let total_payments = standalone_payments(booking) + backed_folio_total;
    let total_bill = room_base_total + paid_folio_total + unpaid_folio_total;

    LedgerSummary {
        nights: booking.nights(),
        room_rate: room_rate(booking, room_type),
        room_base_total,
        unpaid_folio_total,
        paid_folio_total,
        total_payments,
        total_bill,
        net_outstanding: total_bill - total_payments,
    }
}

// =============================================================================
// Charges
// =============================================================================

/// A charge to post to the folio.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCharge {
    pub category: FolioCategory,
    pub description: String,
    pub amount: Money,
    #[serde(default)]
    pub is_inclusive: bool,
}

/// Posts a charge and returns the new line's id.
pub fn add_charge(booking: &mut Booking, charge: NewCharge, now: DateTime<Utc>) -> CoreResult<String> {
    if charge.description.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "description".to_string(),
        }
        .into());
    }
    validate_positive_amount("amount", charge.amount)?;

    let item = FolioItem::new(
        charge.category,
        charge.description.trim(),
        charge.amount,
        charge.is_inclusive,
        now,
    );
    let id = item.id.clone();
    booking.folio.push(item);
    Ok(id)
}

/// Deletes a folio line. A payment that backed it becomes standalone.
pub fn remove_charge(booking: &mut Booking, item_id: &str) -> CoreResult<FolioItem> {
    let idx = booking
        .folio
        .iter()
        .position(|i| i.id == item_id)
        .ok_or_else(|| CoreError::FolioItemNotFound(item_id.to_string()))?;
    Ok(booking.folio.remove(idx))
}

/// Sets the extra-bed count and keeps exactly one matching folio line.
///
/// The line is `Extra Bed Setup x{count}` at `count × extra_bed_charge`,
/// keeps its id across updates and disappears at zero. Applying the same
/// count twice leaves the folio unchanged.
pub fn update_extra_beds(booking: &mut Booking, room_type: &RoomType, count: u32, now: DateTime<Utc>) {
    booking.extra_beds = count;
    let existing = booking
        .folio
        .iter()
        .position(|i| i.category == FolioCategory::Other && i.description.starts_with(EXTRA_BED_DESCRIPTION));

    if count == 0 {
        if let Some(idx) = existing {
            booking.folio.remove(idx);
        }
        return;
    }

    let description = format!("{} x{}", EXTRA_BED_DESCRIPTION, count);
    let amount = room_type.extra_bed_charge * count as i64;
    match existing {
        Some(idx) => {
            let item = &mut booking.folio[idx];
            if item.description != description || item.amount != amount {
                item.description = description;
                item.amount = amount;
                item.timestamp = now;
                item.mark_unpaid();
            }
        }
        None => booking
            .folio
            .push(FolioItem::new(FolioCategory::Other, description, amount, false, now)),
    }
}

// =============================================================================
// Payments
// =============================================================================

/// A payment to record, optionally settling one folio line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequest {
    pub amount: Money,
    pub method: PaymentMethod,
    pub category: PaymentCategory,
    #[serde(default)]
    pub description: Option<String>,
    /// The folio line this payment settles.
    #[serde(default)]
    pub folio_item_id: Option<String>,
}

/// Records a completed payment, linking it to a folio line when asked.
pub fn record_payment(booking: &mut Booking, request: PaymentRequest, now: DateTime<Utc>) -> CoreResult<Payment> {
    validate_positive_amount("amount", request.amount)?;

    let description = match &request.folio_item_id {
        Some(item_id) => {
            let item = booking
                .folio_item(item_id)
                .ok_or_else(|| CoreError::FolioItemNotFound(item_id.clone()))?;
            if item.is_paid {
                return Err(ValidationError::Duplicate {
                    field: "folio item payment".to_string(),
                    value: item_id.clone(),
                }
                .into());
            }
            request
                .description
                .clone()
                .unwrap_or_else(|| format!("Payment for {}", item.description))
        }
        None => request
            .description
            .clone()
            .unwrap_or_else(|| "Partial/General Payment".to_string()),
    };

    let payment = Payment::completed(request.amount, request.method, request.category, Some(description), now);
    booking.payments.push(payment.clone());

    if let Some(item_id) = &request.folio_item_id {
        link_payment(booking, item_id, &payment)?;
    }
    Ok(payment)
}

/// Marks a line paid by an existing completed payment.
pub fn mark_item_paid(booking: &mut Booking, item_id: &str, payment_id: &str) -> CoreResult<()> {
    let payment = booking
        .payment(payment_id)
        .cloned()
        .ok_or_else(|| CoreError::PaymentNotFound(payment_id.to_string()))?;
    if payment.status != PaymentStatus::Completed {
        return Err(CoreError::InvalidPaymentTransition {
            payment_id: payment_id.to_string(),
            current: payment.status.as_str().to_string(),
        });
    }
    link_payment(booking, item_id, &payment)
}

fn link_payment(booking: &mut Booking, item_id: &str, payment: &Payment) -> CoreResult<()> {
    let item = booking
        .folio
        .iter_mut()
        .find(|i| i.id == item_id)
        .ok_or_else(|| CoreError::FolioItemNotFound(item_id.to_string()))?;
    item.is_paid = true;
    item.payment_method = Some(payment.method);
    item.payment_id = Some(payment.id.clone());
    Ok(())
}

/// Returns a line to unpaid. Its payment, if any, stays completed and now
/// counts as a standalone payment.
pub fn mark_item_unpaid(booking: &mut Booking, item_id: &str) -> CoreResult<()> {
    let item = booking
        .folio
        .iter_mut()
        .find(|i| i.id == item_id)
        .ok_or_else(|| CoreError::FolioItemNotFound(item_id.to_string()))?;
    item.mark_unpaid();
    Ok(())
}

/// Refunds or cancels a completed payment; lines it backed become unpaid.
pub fn set_payment_status(booking: &mut Booking, payment_id: &str, status: PaymentStatus) -> CoreResult<()> {
    let payment = booking
        .payments
        .iter_mut()
        .find(|p| p.id == payment_id)
        .ok_or_else(|| CoreError::PaymentNotFound(payment_id.to_string()))?;
    if payment.status != PaymentStatus::Completed || status == PaymentStatus::Completed {
        return Err(CoreError::InvalidPaymentTransition {
            payment_id: payment_id.to_string(),
            current: payment.status.as_str().to_string(),
        });
    }
    payment.status = status;

    for item in booking
        .folio
        .iter_mut()
        .filter(|i| i.payment_id.as_deref() == Some(payment_id))
    {
        item.mark_unpaid();
    }
    Ok(())
}

/// Marks every line paid (final settlement at checkout). The lines are
/// covered by standalone payments, so the balance does not move.
pub fn settle_all_items(booking: &mut Booking) {
    for item in booking.folio.iter_mut().filter(|i| !i.is_paid) {
        item.is_paid = true;
    }
    booking.is_settled = true;
}

// =============================================================================
// Invoice
// =============================================================================

/// One priced line on an invoice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct InvoiceLine {
    pub description: String,
    /// `None` for the room rent line.
    pub category: Option<FolioCategory>,
    pub quantity: i64,
    pub rate: Money,
    /// Amount as charged (inclusive lines include their tax).
    pub amount: Money,
    pub taxable_value: Money,
    pub tax: Money,
    pub tax_rate: TaxRate,
    pub is_inclusive: bool,
    pub is_paid: bool,
}

/// Invoice figures. Rendering is left to the print collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Invoice {
    pub invoice_number: String,
    #[ts(as = "String")]
    pub issued_on: NaiveDate,
    pub property_name: String,
    pub property_address: String,
    pub gst_number: Option<String>,
    pub booking_id: String,
    pub guest_name: String,
    pub room_number: Option<String>,
    pub room_type_name: Option<String>,
    #[ts(as = "String")]
    pub check_in: NaiveDate,
    #[ts(as = "String")]
    pub check_out: NaiveDate,
    pub nights: i64,
    pub lines: Vec<InvoiceLine>,
    pub subtotal: Money,
    pub total_tax: Money,
    pub cgst: Money,
    pub sgst: Money,
    pub grand_total: Money,
}

/// `INV-` plus up to six characters of the id's second `-` segment
/// (`direct-1717200000000-0` → `INV-171720`).
pub fn invoice_number(booking_id: &str) -> String {
    let segment = booking_id
        .split('-')
        .nth(1)
        .filter(|s| !s.is_empty())
        .unwrap_or(booking_id);
    let short: String = segment.chars().take(6).collect();
    format!("INV-{}", short.to_uppercase())
}

/// Taxable value and tax of one charge.
///
/// Inclusive: `base = amount / (1 + rate)`, `tax = amount - base`.
/// Exclusive: `base = amount`, `tax = amount × rate`.
pub fn tax_breakdown(amount: Money, rate: TaxRate, is_inclusive: bool) -> (Money, Money) {
    if is_inclusive {
        amount.split_inclusive(rate)
    } else {
        (amount, amount.calculate_tax(rate))
    }
}

/// Builds the invoice. Room rent is always tax-exclusive at the room slab;
/// each folio line uses the F&B or the general slab.
pub fn build_invoice(
    booking: &Booking,
    room_type: Option<&RoomType>,
    property: &PropertySettings,
    issued_on: NaiveDate,
) -> Invoice {
    let summary = summarize(booking, room_type);
    let room_rate_bps = property.room_tax_rate();
    let (room_base, room_tax) = tax_breakdown(summary.room_base_total, room_rate_bps, false);

    let mut lines = vec![InvoiceLine {
        description: "Room Rent".to_string(),
        category: None,
        quantity: summary.nights,
        rate: summary.room_rate,
        amount: summary.room_base_total,
        taxable_value: room_base,
        tax: room_tax,
        tax_rate: room_rate_bps,
        is_inclusive: false,
        is_paid: false,
    }];

    lines.extend(booking.folio.iter().map(|item| {
        let rate = property.folio_tax_rate(item.category);
        let (taxable_value, tax) = tax_breakdown(item.amount, rate, item.is_inclusive);
        InvoiceLine {
            description: item.description.clone(),
            category: Some(item.category),
            quantity: 1,
            rate: item.amount,
            amount: item.amount,
            taxable_value,
            tax,
            tax_rate: rate,
            is_inclusive: item.is_inclusive,
            is_paid: item.is_paid,
        }
    }));

    let subtotal: Money = lines.iter().map(|l| l.taxable_value).sum();
    let total_tax: Money = lines.iter().map(|l| l.tax).sum();
    let (cgst, sgst) = total_tax.halves();

    Invoice {
        invoice_number: invoice_number(&booking.id),
        issued_on,
        property_name: property.name.clone(),
        property_address: property.address.clone(),
        gst_number: property.gst_number.clone(),
        booking_id: booking.id.clone(),
        guest_name: booking.guest_name.clone(),
        room_number: booking.room_number.clone(),
        room_type_name: room_type.map(|rt| rt.name.clone()),
        check_in: booking.check_in,
        check_out: booking.check_out,
        nights: summary.nights,
        lines,
        subtotal,
        total_tax,
        cgst,
        sgst,
        grand_total: subtotal + total_tax,
    }
}
