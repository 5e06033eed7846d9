//! # Hotel Repository
//!
//! Entries for the property switcher.

use sqlx::SqlitePool;
use stayline_core::Hotel;

use crate::error::DbResult;
use crate::repository::now_text;

#[derive(Debug, sqlx::FromRow)]
struct HotelRow {
    id: String,
    name: String,
    location: String,
    color: String,
}

impl From<HotelRow> for Hotel {
    fn from(row: HotelRow) -> Self {
        Hotel {
            id: row.id,
            name: row.name,
            location: row.location,
            color: row.color,
        }
    }
}

#[derive(Debug, Clone)]
pub struct HotelRepository {
    pool: SqlitePool,
}

impl HotelRepository {
    pub fn new(pool: SqlitePool) -> Self {
        HotelRepository { pool }
    }

    pub async fn list(&self) -> DbResult<Vec<Hotel>> {
        let rows: Vec<HotelRow> = sqlx::query_as("SELECT id, name, location, color FROM hotels ORDER BY name")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Hotel::from).collect())
    }

    pub async fn upsert(&self, hotel: &Hotel) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO hotels (id, name, location, color, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                location = excluded.location,
                color = excluded.color
            "#,
        )
        .bind(&hotel.id)
        .bind(&hotel.name)
        .bind(&hotel.location)
        .bind(&hotel.color)
        .bind(now_text())
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
