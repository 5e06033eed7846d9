//! # Booking Repository
//!
//! Persistence for bookings. The server is authoritative: every write is
//! re-validated by the booking engine against a snapshot read inside the
//! same transaction.
//!
//! ## Write Paths
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  insert_bulk(rows)      BEGIN → engine view → for each row:             │
//! │                           room type exists, dates valid,                │
//! │                           availability > 0 (earlier rows count),        │
//! │                           assigned room free                            │
//! │                         → INSERT all → COMMIT                           │
//! │                                                                         │
//! │  update(b, If-Match)    BEGIN → current = stored copy                   │
//! │                           If-Match == current.version ? (StaleVersion)  │
//! │                           status change allowed, nothing owed at        │
//! │                           checkout, masked ids restored, room conflict  │
//! │                         → UPDATE … WHERE version = current (CAS)        │
//! │                                                                         │
//! │  transfer / checkout    BEGIN → engine view → stayline-core decides     │
//! │                         → write results → COMMIT                        │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The `version` column mirrors `booking.timestamp`, the optimistic-lock
//! token. A write never lowers it.

use chrono::{NaiveDate, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use stayline_core::availability::available_count;
use stayline_core::command::ensure_version;
use stayline_core::dates::{Clock, StayRange};
use stayline_core::ledger::Invoice;
use stayline_core::status::{apply_status, validate_replacement};
use stayline_core::transfer::{transfer, TransferRequest};
use stayline_core::{Booking, BookingStatus, BookingStore, CoreError};
use tracing::{debug, info, warn};

use crate::error::{DbError, DbResult};
use crate::repository::{load_engine_view, now_text};

#[derive(Debug, sqlx::FromRow)]
struct BookingRow {
    document: String,
}

impl TryFrom<BookingRow> for Booking {
    type Error = DbError;

    fn try_from(row: BookingRow) -> DbResult<Self> {
        Ok(serde_json::from_str(&row.document)?)
    }
}

fn decode_all(rows: Vec<BookingRow>) -> DbResult<Vec<Booking>> {
    rows.into_iter().map(Booking::try_from).collect()
}

pub(crate) async fn fetch_all(conn: &mut SqliteConnection) -> DbResult<Vec<Booking>> {
    let rows: Vec<BookingRow> = sqlx::query_as("SELECT document FROM bookings ORDER BY check_in, id")
        .fetch_all(conn)
        .await?;
    decode_all(rows)
}

async fn fetch_one(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Booking>> {
    let row: Option<BookingRow> = sqlx::query_as("SELECT document FROM bookings WHERE id = ?1")
        .bind(id)
        .fetch_optional(conn)
        .await?;
    row.map(Booking::try_from).transpose()
}

fn guest_phone(booking: &Booking) -> Option<String> {
    booking
        .guest_details
        .as_ref()
        .and_then(|g| g.phone_number.as_deref())
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
}

async fn insert_row(conn: &mut SqliteConnection, booking: &Booking) -> DbResult<()> {
    let result = sqlx::query(
        r#"
        INSERT INTO bookings (
            id, reservation_id, room_type_id, room_number, guest_name, guest_phone,
            source, status, version, check_in, check_out, document, updated_at
        )
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
        "#,
    )
    .bind(&booking.id)
    .bind(&booking.reservation_id)
    .bind(&booking.room_type_id)
    .bind(&booking.room_number)
    .bind(&booking.guest_name)
    .bind(guest_phone(booking))
    .bind(booking.source)
    .bind(booking.status)
    .bind(booking.timestamp)
    .bind(booking.check_in)
    .bind(booking.check_out)
    .bind(serde_json::to_string(booking)?)
    .bind(now_text())
    .execute(conn)
    .await;

    match result {
        Ok(_) => Ok(()),
        Err(e) => match DbError::from(e) {
            DbError::UniqueViolation { field, .. } => Err(DbError::duplicate(field, &booking.id)),
            other => Err(other),
        },
    }
}

/// Compare-and-swap write: only lands while the stored version is still
/// `previous_version`.
async fn update_row(conn: &mut SqliteConnection, booking: &Booking, previous_version: i64) -> DbResult<()> {
    let result = sqlx::query(
        r#"
        UPDATE bookings
        SET reservation_id = ?2, room_type_id = ?3, room_number = ?4, guest_name = ?5,
            guest_phone = ?6, source = ?7, status = ?8, version = ?9, check_in = ?10,
            check_out = ?11, document = ?12, updated_at = ?13
        WHERE id = ?1 AND version = ?14
        "#,
    )
    .bind(&booking.id)
    .bind(&booking.reservation_id)
    .bind(&booking.room_type_id)
    .bind(&booking.room_number)
    .bind(&booking.guest_name)
    .bind(guest_phone(booking))
    .bind(booking.source)
    .bind(booking.status)
    .bind(booking.timestamp)
    .bind(booking.check_in)
    .bind(booking.check_out)
    .bind(serde_json::to_string(booking)?)
    .bind(now_text())
    .bind(previous_version)
    .execute(conn)
    .await?;

    if result.rows_affected() == 0 {
        warn!(booking_id = %booking.id, previous_version, "Booking changed underneath the write");
        return Err(CoreError::StaleVersion {
            booking_id: booking.id.clone(),
            expected: previous_version,
            actual: -1,
        }
        .into());
    }
    Ok(())
}

/// Room-holding checks for a booking about to be stored.
fn check_room_hold(store: &BookingStore, booking: &Booking) -> DbResult<()> {
    StayRange::new(booking.check_in, booking.check_out).map_err(CoreError::from)?;
    let room_type = store.require_room_type(&booking.room_type_id)?;
    if !booking.occupies_room() {
        return Ok(());
    }

    match booking.room_number.as_deref() {
        Some(room) => {
            if !room_type.has_room(room) {
                return Err(CoreError::RoomNotFound(room.to_string()).into());
            }
            if let Some(other) = store.room_conflict(room, booking.check_in, booking.check_out, Some(&booking.id)) {
                return Err(CoreError::RoomConflict {
                    room_number: room.to_string(),
                    conflicting_booking_id: other.id.clone(),
                }
                .into());
            }
        }
        None => {
            if available_count(store, &booking.room_type_id, booking.check_in, booking.check_out, &[&booking.id]) == 0 {
                return Err(CoreError::AvailabilityConflict {
                    room_type_id: booking.room_type_id.clone(),
                    check_in: booking.check_in.to_string(),
                    check_out: booking.check_out.to_string(),
                }
                .into());
            }
        }
    }
    Ok(())
}

/// Repository for booking database operations.
#[derive(Debug, Clone)]
pub struct BookingRepository {
    pool: SqlitePool,
}

impl BookingRepository {
    pub fn new(pool: SqlitePool) -> Self {
        BookingRepository { pool }
    }

    /// Every booking, ordered by arrival.
    pub async fn list(&self) -> DbResult<Vec<Booking>> {
        let mut conn = self.pool.acquire().await?;
        fetch_all(&mut conn).await
    }

    /// Bookings sharing at least one night with `[from, to)`.
    pub async fn list_range(&self, from: NaiveDate, to: NaiveDate) -> DbResult<Vec<Booking>> {
        let rows: Vec<BookingRow> = sqlx::query_as(
            r#"
            SELECT document FROM bookings
            WHERE check_in < ?2 AND check_out > ?1
            ORDER BY check_in, id
            "#,
        )
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;
        decode_all(rows)
    }

    pub async fn get(&self, id: &str) -> DbResult<Option<Booking>> {
        let mut conn = self.pool.acquire().await?;
        fetch_one(&mut conn, id).await
    }

    pub async fn require(&self, id: &str) -> DbResult<Booking> {
        self.get(id)
            .await?
            .ok_or_else(|| CoreError::BookingNotFound(id.to_string()).into())
    }

    /// Stores new bookings after re-checking availability.
    ///
    /// Rows are checked in order and each accepted row counts against the
    /// next, so a batch can never overbook itself. All or nothing.
    pub async fn insert_bulk(&self, bookings: &[Booking]) -> DbResult<Vec<Booking>> {
        debug!(count = bookings.len(), "Inserting bookings");
        let mut tx = self.pool.begin().await?;
        let mut store = load_engine_view(&mut tx).await?;

        for booking in bookings {
            if store.booking(&booking.id).is_some() {
                return Err(DbError::duplicate("bookings.id", &booking.id));
            }
            check_room_hold(&store, booking)?;
            store.upsert_booking(booking.clone());
        }
        for booking in bookings {
            insert_row(&mut tx, booking).await?;
        }

        tx.commit().await?;
        info!(
            count = bookings.len(),
            reservation_id = ?bookings.first().and_then(|b| b.reservation_id.as_deref()),
            "Bookings created"
        );
        Ok(bookings.to_vec())
    }

    /// Replaces a booking.
    ///
    /// With `expected_version` (the `If-Match` header) the write is refused
    /// unless the stored copy is still at that version. Masked identity
    /// numbers in the incoming copy are replaced by the stored clear ones.
    /// A status change must follow the transition table, and a copy that
    /// arrives checked out must owe nothing. The stored version always rises.
    pub async fn update(&self, booking: Booking, expected_version: Option<i64>) -> DbResult<Booking> {
        let mut booking = booking;
        let mut tx = self.pool.begin().await?;
        let store = load_engine_view(&mut tx).await?;

        let current = store.require_booking(&booking.id)?;
        if let Some(expected) = expected_version {
            ensure_version(current, expected)?;
        }

        validate_replacement(&store, current, &booking)?;

        booking.restore_masked_ids(current);
        let floor = current.timestamp + 1;
        if booking.timestamp < floor {
            booking.timestamp = floor.max(Utc::now().timestamp_millis());
        }
        check_room_hold(&store, &booking)?;

        update_row(&mut tx, &booking, current.timestamp).await?;
        tx.commit().await?;
        debug!(booking_id = %booking.id, version = booking.timestamp, "Booking updated");
        Ok(booking)
    }

    /// Runs a room transfer server-side. Returns the original (truncated or
    /// moved) first and, for a mid-stay split, the continuation second.
    pub async fn transfer(
        &self,
        booking_id: &str,
        expected_version: Option<i64>,
        request: &TransferRequest,
        now_millis: i64,
    ) -> DbResult<Vec<Booking>> {
        let mut tx = self.pool.begin().await?;
        let store = load_engine_view(&mut tx).await?;

        let live = store.require_booking(booking_id)?;
        if let Some(expected) = expected_version {
            ensure_version(live, expected)?;
        }
        let outcome = transfer(&store, live, request, now_millis)?;
        let previous_version = live.timestamp;
        let bookings = outcome.into_bookings();

        for booking in &bookings {
            if booking.id == booking_id {
                update_row(&mut tx, booking, previous_version).await?;
            } else {
                insert_row(&mut tx, booking).await?;
            }
        }

        tx.commit().await?;
        info!(
            booking_id = %booking_id,
            room = %request.new_room_number,
            effective = %request.effective_date,
            records = bookings.len(),
            "Room transfer saved"
        );
        Ok(bookings)
    }

    /// Checks a guest out: refuses while money is owed, otherwise stamps
    /// departure, settles the folio and returns the invoice.
    pub async fn checkout(
        &self,
        booking_id: &str,
        expected_version: Option<i64>,
        clock: &dyn Clock,
    ) -> DbResult<(Booking, Invoice)> {
        let mut tx = self.pool.begin().await?;
        let store = load_engine_view(&mut tx).await?;

        let live = store.require_booking(booking_id)?;
        if let Some(expected) = expected_version {
            ensure_version(live, expected)?;
        }

        let mut working = live.clone();
        let effects = apply_status(&store, &mut working, BookingStatus::CheckedOut, clock)?;
        working.touch(clock.now_millis());
        let invoice = effects
            .invoice
            .ok_or_else(|| DbError::Internal(format!("checkout of {booking_id} produced no invoice")))?;

        update_row(&mut tx, &working, live.timestamp).await?;
        tx.commit().await?;
        info!(booking_id = %booking_id, invoice = %invoice.invoice_number, "Guest checked out");
        Ok((working, invoice))
    }

    /// Past stays of a guest matched by name (case-insensitive) or phone,
    /// newest first. Blank inputs never match.
    pub async fn guest_history(
        &self,
        name: Option<&str>,
        phone: Option<&str>,
        exclude_booking_id: Option<&str>,
    ) -> DbResult<Vec<Booking>> {
        let name = name.map(str::trim).unwrap_or_default();
        let phone = phone.map(str::trim).unwrap_or_default();
        if name.is_empty() && phone.is_empty() {
            return Ok(Vec::new());
        }

        let rows: Vec<BookingRow> = sqlx::query_as(
            r#"
            SELECT document FROM bookings
            WHERE ((?1 <> '' AND guest_name = ?1 COLLATE NOCASE)
                OR (?2 <> '' AND guest_phone = ?2))
              AND (?3 IS NULL OR id <> ?3)
            ORDER BY check_in DESC, id
            "#,
        )
        .bind(name)
        .bind(phone)
        .bind(exclude_booking_id)
        .fetch_all(&self.pool)
        .await?;
        decode_all(rows)
    }

    /// True when the guest has stayed before.
    pub async fn is_repeat_guest(
        &self,
        name: Option<&str>,
        phone: Option<&str>,
        exclude_booking_id: Option<&str>,
    ) -> DbResult<bool> {
        Ok(!self.guest_history(name, phone, exclude_booking_id).await?.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::{booking, d, db_with_inventory};
    use stayline_core::dates::FixedClock;
    use stayline_core::money::Money;
    use stayline_core::{FolioCategory, FolioItem, GuestDetails};

    #[tokio::test]
    async fn test_insert_and_read_back() {
        let db = db_with_inventory().await;
        let b = booking("b-1", "101", "2024-06-01", "2024-06-03");
        db.bookings().insert_bulk(&[b.clone()]).await.unwrap();

        let stored = db.bookings().require("b-1").await.unwrap();
        assert_eq!(stored, b);
        assert_eq!(db.bookings().list_range(d("2024-06-02"), d("2024-06-10")).await.unwrap().len(), 1);
        assert!(db.bookings().list_range(d("2024-06-03"), d("2024-06-10")).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_bulk_rejects_overbooking_atomically() {
        let db = db_with_inventory().await;
        let rows = vec![
            booking("b-1", "101", "2024-06-01", "2024-06-03"),
            booking("b-2", "101", "2024-06-02", "2024-06-04"),
        ];
        let err = db.bookings().insert_bulk(&rows).await.unwrap_err();
        assert!(matches!(err.as_rule(), Some(CoreError::RoomConflict { .. })));
        assert!(db.bookings().list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unassigned_rows_compete_for_capacity() {
        let db = db_with_inventory().await;
        let mut rows: Vec<Booking> = (0..3)
            .map(|i| booking(&format!("u-{i}"), "101", "2024-06-01", "2024-06-02"))
            .collect();
        for row in rows.iter_mut() {
            row.room_number = None;
        }
        // Deluxe has two rooms; the third unassigned row cannot fit
        let err = db.bookings().insert_bulk(&rows).await.unwrap_err();
        assert_eq!(err.as_rule().map(CoreError::code), Some("AVAILABILITY_CONFLICT"));
        db.bookings().insert_bulk(&rows[..2]).await.unwrap();
    }

    #[tokio::test]
    async fn test_duplicate_id_rejected() {
        let db = db_with_inventory().await;
        let b = booking("b-1", "101", "2024-06-01", "2024-06-03");
        db.bookings().insert_bulk(&[b.clone()]).await.unwrap();
        assert!(matches!(
            db.bookings().insert_bulk(&[b]).await,
            Err(DbError::UniqueViolation { .. })
        ));
    }

    #[tokio::test]
    async fn test_update_with_stale_version_is_refused() {
        let db = db_with_inventory().await;
        let b = booking("b-1", "101", "2024-06-01", "2024-06-03");
        db.bookings().insert_bulk(&[b.clone()]).await.unwrap();

        let mut edit = b.clone();
        edit.is_vip = true;
        edit.touch(2_000);
        let saved = db.bookings().update(edit, Some(1_000)).await.unwrap();
        assert_eq!(saved.timestamp, 2_000);

        // A second clerk still holding version 1000
        let mut late = b.clone();
        late.special_requests = Some("Late checkout".to_string());
        let err = db.bookings().update(late, Some(1_000)).await.unwrap_err();
        assert!(err.as_rule().is_some_and(CoreError::is_lock_conflict));

        let stored = db.bookings().require("b-1").await.unwrap();
        assert!(stored.is_vip);
        assert_eq!(stored.special_requests, None);
    }

    #[tokio::test]
    async fn test_update_without_if_match_still_raises_version() {
        let db = db_with_inventory().await;
        let b = booking("b-1", "101", "2024-06-01", "2024-06-03");
        db.bookings().insert_bulk(&[b.clone()]).await.unwrap();

        let saved = db.bookings().update(b, None).await.unwrap();
        assert!(saved.timestamp > 1_000);
    }

    #[tokio::test]
    async fn test_update_runs_status_rules() {
        let db = db_with_inventory().await;
        let b = booking("b-1", "101", "2024-06-01", "2024-06-03");
        db.bookings().insert_bulk(&[b.clone()]).await.unwrap();

        let mut skipped = b.clone();
        skipped.status = BookingStatus::CheckedOut;
        let err = db.bookings().update(skipped, Some(1_000)).await.unwrap_err();
        assert_eq!(err.as_rule().map(CoreError::code), Some("INVALID_STATUS_TRANSITION"));

        let mut arrived = b.clone();
        arrived.status = BookingStatus::CheckedIn;
        let arrived = db.bookings().update(arrived, Some(1_000)).await.unwrap();

        let mut leaving = arrived.clone();
        leaving.status = BookingStatus::CheckedOut;
        let err = db.bookings().update(leaving, Some(arrived.timestamp)).await.unwrap_err();
        assert_eq!(err.as_rule().map(CoreError::code), Some("CHECKOUT_BLOCKED"));
        assert_eq!(db.bookings().require("b-1").await.unwrap().status, BookingStatus::CheckedIn);
    }

    #[tokio::test]
    async fn test_update_keeps_clear_id_behind_mask() {
        let db = db_with_inventory().await;
        let mut b = booking("b-1", "101", "2024-06-01", "2024-06-03");
        let mut details = GuestDetails::default();
        details.set_id_number("123412341234");
        b.guest_details = Some(details);
        db.bookings().insert_bulk(&[b.clone()]).await.unwrap();

        let mut edit = b.redacted();
        edit.guest_name = "Asha R.".to_string();
        let saved = db.bookings().update(edit, Some(1_000)).await.unwrap();
        assert_eq!(saved.guest_details, b.guest_details);
    }

    #[tokio::test]
    async fn test_update_cannot_move_into_taken_room() {
        let db = db_with_inventory().await;
        db.bookings()
            .insert_bulk(&[
                booking("b-1", "101", "2024-06-01", "2024-06-03"),
                booking("b-2", "102", "2024-06-01", "2024-06-03"),
            ])
            .await
            .unwrap();

        let mut moved = db.bookings().require("b-2").await.unwrap();
        moved.room_number = Some("101".to_string());
        let err = db.bookings().update(moved, Some(1_000)).await.unwrap_err();
        assert!(matches!(err.as_rule(), Some(CoreError::RoomConflict { .. })));
    }

    #[tokio::test]
    async fn test_mid_stay_transfer_splits_records() {
        let db = db_with_inventory().await;
        let mut b = booking("b-1", "101", "2024-06-01", "2024-06-04");
        b.status = BookingStatus::CheckedIn;
        db.bookings().insert_bulk(&[b]).await.unwrap();

        let request = TransferRequest {
            new_room_type_id: "rt-2".to_string(),
            new_room_number: "201".to_string(),
            effective_date: d("2024-06-02"),
            keep_rate: true,
            transfer_folio: false,
        };
        let saved = db.bookings().transfer("b-1", Some(1_000), &request, 5_000).await.unwrap();
        assert_eq!(saved.len(), 2);
        assert_eq!(saved[0].check_out, d("2024-06-02"));
        assert_eq!(saved[1].check_in, d("2024-06-02"));
        assert_eq!(saved[1].room_number.as_deref(), Some("201"));

        let all = db.bookings().list().await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(db.bookings().require("b-1").await.unwrap().check_out, d("2024-06-02"));
    }

    #[tokio::test]
    async fn test_checkout_blocked_then_allowed() {
        let db = db_with_inventory().await;
        let mut b = booking("b-1", "101", "2024-06-01", "2024-06-03");
        b.status = BookingStatus::CheckedIn;
        b.folio.push(FolioItem::new(
            FolioCategory::Laundry,
            "Laundry",
            Money::from_major(200),
            false,
            Utc::now(),
        ));
        db.bookings().insert_bulk(&[b]).await.unwrap();

        let clock = FixedClock::on(d("2024-06-03"));
        let err = db.bookings().checkout("b-1", None, &clock).await.unwrap_err();
        assert_eq!(err.as_rule().map(CoreError::code), Some("CHECKOUT_BLOCKED"));

        // Settle the room and the laundry line, then check out
        let mut paid = db.bookings().require("b-1").await.unwrap();
        paid.payments.push(stayline_core::Payment::completed(
            Money::from_major(2_200),
            stayline_core::PaymentMethod::Cash,
            stayline_core::PaymentCategory::Room,
            None,
            Utc::now(),
        ));
        db.bookings().update(paid, None).await.unwrap();

        let (out, invoice) = db.bookings().checkout("b-1", None, &clock).await.unwrap();
        assert_eq!(out.status, BookingStatus::CheckedOut);
        assert!(out.folio.iter().all(|i| i.is_paid));
        assert_eq!(invoice.invoice_number, "INV-1");
    }

    #[tokio::test]
    async fn test_guest_history_matches_name_or_phone() {
        let db = db_with_inventory().await;
        let mut first = booking("b-1", "101", "2024-05-01", "2024-05-03");
        first.guest_name = "Asha Rao".to_string();
        first.status = BookingStatus::CheckedOut;
        let mut second = booking("b-2", "102", "2024-05-10", "2024-05-12");
        second.guest_name = "A. Rao".to_string();
        second.status = BookingStatus::CheckedOut;
        let mut second_details = GuestDetails::default();
        second_details.phone_number = Some("9876543210".to_string());
        second.guest_details = Some(second_details);
        let mut current = booking("b-3", "101", "2024-06-01", "2024-06-03");
        current.guest_name = "Asha Rao".to_string();
        db.bookings().insert_bulk(&[first, second, current]).await.unwrap();

        let history = db
            .bookings()
            .guest_history(Some("asha rao"), Some("9876543210"), Some("b-3"))
            .await
            .unwrap();
        let ids: Vec<_> = history.iter().map(|b| b.id.as_str()).collect();
        assert_eq!(ids, vec!["b-2", "b-1"]);

        assert!(db.bookings().guest_history(Some("  "), None, None).await.unwrap().is_empty());
        assert!(!db.bookings().is_repeat_guest(Some("Nobody"), None, None).await.unwrap());
    }
}
