//! # Property Repository
//!
//! The single property-settings row: profile fields and GST slabs. Reads
//! fall back to defaults until the property is first saved.

use sqlx::{SqliteConnection, SqlitePool};
use stayline_core::PropertySettings;
use tracing::info;

use crate::error::DbResult;
use crate::repository::now_text;

#[derive(Debug, sqlx::FromRow)]
struct PropertyRow {
    name: String,
    address: String,
    phone: Option<String>,
    email: Option<String>,
    gst_number: Option<String>,
    gst_rate: f64,
    food_gst_rate: f64,
    other_gst_rate: f64,
}

impl From<PropertyRow> for PropertySettings {
    fn from(row: PropertyRow) -> Self {
        PropertySettings {
            name: row.name,
            address: row.address,
            phone: row.phone,
            email: row.email,
            gst_number: row.gst_number,
            gst_rate: row.gst_rate,
            food_gst_rate: row.food_gst_rate,
            other_gst_rate: row.other_gst_rate,
        }
    }
}

pub(crate) async fn fetch(conn: &mut SqliteConnection) -> DbResult<PropertySettings> {
    let row: Option<PropertyRow> = sqlx::query_as(
        r#"
        SELECT name, address, phone, email, gst_number, gst_rate, food_gst_rate, other_gst_rate
        FROM property_settings
        WHERE id = 1
        "#,
    )
    .fetch_optional(conn)
    .await?;
    Ok(row.map(PropertySettings::from).unwrap_or_default())
}

#[derive(Debug, Clone)]
pub struct PropertyRepository {
    pool: SqlitePool,
}

impl PropertyRepository {
    pub fn new(pool: SqlitePool) -> Self {
        PropertyRepository { pool }
    }

    pub async fn get(&self) -> DbResult<PropertySettings> {
        let mut conn = self.pool.acquire().await?;
        fetch(&mut conn).await
    }

    pub async fn put(&self, settings: &PropertySettings) -> DbResult<PropertySettings> {
        sqlx::query(
            r#"
            INSERT INTO property_settings (
                id, name, address, phone, email, gst_number,
                gst_rate, food_gst_rate, other_gst_rate, updated_at
            )
            VALUES (1, ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                address = excluded.address,
                phone = excluded.phone,
                email = excluded.email,
                gst_number = excluded.gst_number,
                gst_rate = excluded.gst_rate,
                food_gst_rate = excluded.food_gst_rate,
                other_gst_rate = excluded.other_gst_rate,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&settings.name)
        .bind(&settings.address)
        .bind(&settings.phone)
        .bind(&settings.email)
        .bind(&settings.gst_number)
        .bind(settings.gst_rate)
        .bind(settings.food_gst_rate)
        .bind(settings.other_gst_rate)
        .bind(now_text())
        .execute(&self.pool)
        .await?;

        info!(name = %settings.name, "Property settings saved");
        Ok(settings.clone())
    }
}
