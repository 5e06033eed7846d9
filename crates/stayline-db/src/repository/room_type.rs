//! # Room Type Repository
//!
//! Inventory maintenance: categories and their physical rooms.
//!
//! ## Removal Guard
//! ```text
//! update(Deluxe: [101, 102, 103] → [101, 102])
//!       │
//!       ▼
//! removed = {103}
//!       │
//!       ▼
//! any Confirmed/CheckedIn booking in 103 with check_out > today?
//!       ├── yes → RoomInUse (nothing written)
//!       └── no  → UPDATE
//! ```
//! Deleting a category runs the same guard over every booking of the type.

use chrono::NaiveDate;
use sqlx::{SqliteConnection, SqlitePool};
use stayline_core::money::Money;
use stayline_core::validation::validate_room_type;
use stayline_core::{CoreError, RoomType};
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::repository::{now_text, to_u32};

#[derive(Debug, sqlx::FromRow)]
struct RoomTypeRow {
    id: String,
    name: String,
    total_capacity: i64,
    base_occupancy: i64,
    base_price: i64,
    floor_price: i64,
    ceiling_price: i64,
    extra_bed_charge: i64,
    amenities: String,
    room_numbers: String,
}

impl TryFrom<RoomTypeRow> for RoomType {
    type Error = DbError;

    fn try_from(row: RoomTypeRow) -> DbResult<Self> {
        Ok(RoomType {
            total_capacity: to_u32("total_capacity", row.total_capacity)?,
            base_occupancy: to_u32("base_occupancy", row.base_occupancy)?,
            base_price: Money::from_minor(row.base_price),
            floor_price: Money::from_minor(row.floor_price),
            ceiling_price: Money::from_minor(row.ceiling_price),
            extra_bed_charge: Money::from_minor(row.extra_bed_charge),
            amenities: serde_json::from_str(&row.amenities)?,
            room_numbers: serde_json::from_str(&row.room_numbers)?,
            id: row.id,
            name: row.name,
        })
    }
}

const SELECT_ROOM_TYPE: &str = r#"
    SELECT id, name, total_capacity, base_occupancy, base_price, floor_price,
           ceiling_price, extra_bed_charge, amenities, room_numbers
    FROM room_types
"#;

pub(crate) async fn fetch_all(conn: &mut SqliteConnection) -> DbResult<Vec<RoomType>> {
    let rows: Vec<RoomTypeRow> = sqlx::query_as(&format!("{SELECT_ROOM_TYPE} ORDER BY sort_order, id"))
        .fetch_all(conn)
        .await?;
    rows.into_iter().map(RoomType::try_from).collect()
}

/// The first active booking (occupying, leaving after `today`) that holds
/// `room_number`.
async fn active_booking_in_room(conn: &mut SqliteConnection, room_number: &str, today: NaiveDate) -> DbResult<Option<String>> {
    let id: Option<String> = sqlx::query_scalar(
        r#"
        SELECT id FROM bookings
        WHERE room_number = ?1
          AND status IN ('Confirmed', 'CheckedIn')
          AND check_out > ?2
        ORDER BY check_in
        LIMIT 1
        "#,
    )
    .bind(room_number)
    .bind(today)
    .fetch_optional(conn)
    .await?;
    Ok(id)
}

/// Repository for room type database operations.
#[derive(Debug, Clone)]
pub struct RoomTypeRepository {
    pool: SqlitePool,
}

impl RoomTypeRepository {
    pub fn new(pool: SqlitePool) -> Self {
        RoomTypeRepository { pool }
    }

    /// All room types in display order.
    pub async fn list(&self) -> DbResult<Vec<RoomType>> {
        let mut conn = self.pool.acquire().await?;
        fetch_all(&mut conn).await
    }

    pub async fn get(&self, id: &str) -> DbResult<Option<RoomType>> {
        let row: Option<RoomTypeRow> = sqlx::query_as(&format!("{SELECT_ROOM_TYPE} WHERE id = ?1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(RoomType::try_from).transpose()
    }

    /// Creates a room type after validating it against the inventory.
    pub async fn insert(&self, room_type: &RoomType) -> DbResult<RoomType> {
        debug!(id = %room_type.id, "Inserting room type");
        let mut tx = self.pool.begin().await?;

        let existing = fetch_all(&mut tx).await?;
        if existing.iter().any(|rt| rt.id == room_type.id) {
            return Err(DbError::duplicate("room_types.id", &room_type.id));
        }
        validate_room_type(room_type, &existing).map_err(CoreError::from)?;

        let now = now_text();
        sqlx::query(
            r#"
            INSERT INTO room_types (
                id, name, total_capacity, base_occupancy, base_price, floor_price,
                ceiling_price, extra_bed_charge, amenities, room_numbers, sort_order,
                created_at, updated_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10,
                    (SELECT COALESCE(MAX(sort_order), 0) + 1 FROM room_types), ?11, ?11)
            "#,
        )
        .bind(&room_type.id)
        .bind(room_type.name.trim())
        .bind(i64::from(room_type.total_capacity))
        .bind(i64::from(room_type.base_occupancy))
        .bind(room_type.base_price.minor())
        .bind(room_type.floor_price.minor())
        .bind(room_type.ceiling_price.minor())
        .bind(room_type.extra_bed_charge.minor())
        .bind(serde_json::to_string(&room_type.amenities)?)
        .bind(serde_json::to_string(&trimmed_rooms(room_type))?)
        .bind(&now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        info!(id = %room_type.id, rooms = room_type.total_capacity, "Room type created");
        Ok(normalized(room_type))
    }

    /// Replaces a room type. Removing a room an active booking still holds
    /// fails with `RoomInUse`.
    pub async fn update(&self, room_type: &RoomType, today: NaiveDate) -> DbResult<RoomType> {
        debug!(id = %room_type.id, "Updating room type");
        let mut tx = self.pool.begin().await?;

        let existing = fetch_all(&mut tx).await?;
        let current = existing
            .iter()
            .find(|rt| rt.id == room_type.id)
            .ok_or_else(|| DbError::not_found("RoomType", &room_type.id))?;
        validate_room_type(room_type, &existing).map_err(CoreError::from)?;

        let kept = normalized(room_type);
        let kept_rooms = kept.rooms();
        for removed in current.rooms().iter().filter(|r| !kept_rooms.contains(r)) {
            if let Some(booking_id) = active_booking_in_room(&mut tx, removed, today).await? {
                return Err(CoreError::RoomInUse {
                    room_number: removed.clone(),
                    booking_id,
                }
                .into());
            }
        }

        sqlx::query(
            r#"
            UPDATE room_types
            SET name = ?2, total_capacity = ?3, base_occupancy = ?4, base_price = ?5,
                floor_price = ?6, ceiling_price = ?7, extra_bed_charge = ?8,
                amenities = ?9, room_numbers = ?10, updated_at = ?11
            WHERE id = ?1
            "#,
        )
        .bind(&kept.id)
        .bind(&kept.name)
        .bind(i64::from(kept.total_capacity))
        .bind(i64::from(kept.base_occupancy))
        .bind(kept.base_price.minor())
        .bind(kept.floor_price.minor())
        .bind(kept.ceiling_price.minor())
        .bind(kept.extra_bed_charge.minor())
        .bind(serde_json::to_string(&kept.amenities)?)
        .bind(serde_json::to_string(&kept.room_numbers)?)
        .bind(now_text())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        info!(id = %kept.id, "Room type updated");
        Ok(kept)
    }

    /// Deletes a room type unless one of its bookings is still active.
    /// Checked-out history keeps its `room_type_id`.
    pub async fn delete(&self, id: &str, today: NaiveDate) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;

        let blocking: Option<(String, Option<String>)> = sqlx::query_as(
            r#"
            SELECT id, room_number FROM bookings
            WHERE room_type_id = ?1
              AND status IN ('Confirmed', 'CheckedIn')
              AND check_out > ?2
            ORDER BY check_in
            LIMIT 1
            "#,
        )
        .bind(id)
        .bind(today)
        .fetch_optional(&mut *tx)
        .await?;
        if let Some((booking_id, room_number)) = blocking {
            return Err(CoreError::RoomInUse {
                room_number: room_number.unwrap_or_else(|| "unassigned".to_string()),
                booking_id,
            }
            .into());
        }

        let result = sqlx::query("DELETE FROM room_types WHERE id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DbError::not_found("RoomType", id));
        }

        tx.commit().await?;
        info!(id = %id, "Room type deleted");
        Ok(())
    }
}

fn trimmed_rooms(room_type: &RoomType) -> Vec<String> {
    room_type.room_numbers.iter().map(|r| r.trim().to_string()).collect()
}

fn normalized(room_type: &RoomType) -> RoomType {
    RoomType {
        name: room_type.name.trim().to_string(),
        room_numbers: trimmed_rooms(room_type),
        ..room_type.clone()
    }
}
