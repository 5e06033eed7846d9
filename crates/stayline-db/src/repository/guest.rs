//! # Guest Repository
//!
//! Returning-guest profiles, keyed by phone number. Checking a guest in
//! upserts their profile; the new-booking form looks them up.

use chrono::NaiveDate;
use sqlx::SqlitePool;
use stayline_core::{GuestProfile, IdType};
use tracing::debug;

use crate::error::DbResult;
use crate::repository::now_text;

/// Most candidates a lookup returns.
const LOOKUP_LIMIT: i64 = 10;

#[derive(Debug, sqlx::FromRow)]
struct GuestRow {
    id: i64,
    name: String,
    phone_number: String,
    id_type: Option<String>,
    address: Option<String>,
    dob: Option<String>,
    nationality: Option<String>,
    preferences: Option<String>,
    last_check_in: Option<NaiveDate>,
}

impl From<GuestRow> for GuestProfile {
    fn from(row: GuestRow) -> Self {
        GuestProfile {
            id: Some(row.id),
            name: row.name,
            phone_number: row.phone_number,
            // An unreadable id type is dropped rather than failing the lookup
            id_type: row.id_type.as_deref().and_then(id_type_from_text),
            address: row.address,
            dob: row.dob,
            nationality: row.nationality,
            preferences: row.preferences,
            last_check_in: row.last_check_in,
        }
    }
}

fn id_type_to_text(id_type: Option<IdType>) -> DbResult<Option<String>> {
    let Some(id_type) = id_type else {
        return Ok(None);
    };
    match serde_json::to_value(id_type)? {
        serde_json::Value::String(s) => Ok(Some(s)),
        _ => Ok(None),
    }
}

fn id_type_from_text(text: &str) -> Option<IdType> {
    serde_json::from_value(serde_json::Value::String(text.to_string())).ok()
}

const SELECT_GUEST: &str = r#"
    SELECT id, name, phone_number, id_type, address, dob, nationality, preferences, last_check_in
    FROM guest_profiles
"#;

#[derive(Debug, Clone)]
pub struct GuestRepository {
    pool: SqlitePool,
}

impl GuestRepository {
    pub fn new(pool: SqlitePool) -> Self {
        GuestRepository { pool }
    }

    /// Best-effort match: name substring (case-insensitive) or exact phone.
    /// Blank input returns no candidates.
    pub async fn lookup(&self, name: Option<&str>, phone: Option<&str>) -> DbResult<Vec<GuestProfile>> {
        let name = name.map(str::trim).unwrap_or_default();
        let phone = phone.map(str::trim).unwrap_or_default();
        if name.is_empty() && phone.is_empty() {
            return Ok(Vec::new());
        }
        debug!(name = %name, phone = %phone, "Guest lookup");

        let rows: Vec<GuestRow> = sqlx::query_as(&format!(
            r#"{SELECT_GUEST}
            WHERE (?1 <> '' AND name LIKE '%' || ?1 || '%')
               OR (?2 <> '' AND phone_number = ?2)
            ORDER BY (phone_number = ?2) DESC, last_check_in DESC, name
            LIMIT ?3
            "#
        ))
        .bind(name)
        .bind(phone)
        .bind(LOOKUP_LIMIT)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(GuestProfile::from).collect())
    }

    pub async fn get_by_phone(&self, phone: &str) -> DbResult<Option<GuestProfile>> {
        let row: Option<GuestRow> = sqlx::query_as(&format!("{SELECT_GUEST} WHERE phone_number = ?1"))
            .bind(phone.trim())
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(GuestProfile::from))
    }

    /// Inserts or refreshes the profile for `profile.phone_number`. Fields
    /// left empty keep their stored values.
    pub async fn upsert(&self, profile: &GuestProfile) -> DbResult<GuestProfile> {
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO guest_profiles (
                name, phone_number, id_type, address, dob, nationality,
                preferences, last_check_in, updated_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            ON CONFLICT(phone_number) DO UPDATE SET
                name = excluded.name,
                id_type = COALESCE(excluded.id_type, guest_profiles.id_type),
                address = COALESCE(excluded.address, guest_profiles.address),
                dob = COALESCE(excluded.dob, guest_profiles.dob),
                nationality = COALESCE(excluded.nationality, guest_profiles.nationality),
                preferences = COALESCE(excluded.preferences, guest_profiles.preferences),
                last_check_in = COALESCE(excluded.last_check_in, guest_profiles.last_check_in),
                updated_at = excluded.updated_at
            RETURNING id
            "#,
        )
        .bind(profile.name.trim())
        .bind(profile.phone_number.trim())
        .bind(id_type_to_text(profile.id_type)?)
        .bind(&profile.address)
        .bind(&profile.dob)
        .bind(&profile.nationality)
        .bind(&profile.preferences)
        .bind(profile.last_check_in)
        .bind(now_text())
        .fetch_one(&self.pool)
        .await?;

        debug!(guest_id = id, "Guest profile saved");
        Ok(self
            .get_by_phone(&profile.phone_number)
            .await?
            .unwrap_or_else(|| GuestProfile {
                id: Some(id),
                ..profile.clone()
            }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};

    fn asha() -> GuestProfile {
        GuestProfile {
            id: None,
            name: "Asha Rao".to_string(),
            phone_number: "9876543210".to_string(),
            id_type: Some(IdType::DrivingLicense),
            address: Some("Deoghar".to_string()),
            dob: None,
            nationality: Some("Indian".to_string()),
            preferences: None,
            last_check_in: NaiveDate::from_ymd_opt(2024, 6, 1),
        }
    }

    #[tokio::test]
    async fn test_upsert_then_lookup() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let saved = db.guests().upsert(&asha()).await.unwrap();
        assert!(saved.id.is_some());
        assert_eq!(saved.id_type, Some(IdType::DrivingLicense));

        let by_name = db.guests().lookup(Some("rao"), None).await.unwrap();
        assert_eq!(by_name.len(), 1);
        let by_phone = db.guests().lookup(None, Some(" 9876543210 ")).await.unwrap();
        assert_eq!(by_phone[0].name, "Asha Rao");
    }

    #[tokio::test]
    async fn test_upsert_keeps_known_fields() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let first = db.guests().upsert(&asha()).await.unwrap();

        let again = GuestProfile {
            address: None,
            last_check_in: NaiveDate::from_ymd_opt(2024, 7, 9),
            ..asha()
        };
        let second = db.guests().upsert(&again).await.unwrap();
        assert_eq!(second.id, first.id);
        assert_eq!(second.address.as_deref(), Some("Deoghar"));
        assert_eq!(second.last_check_in, NaiveDate::from_ymd_opt(2024, 7, 9));
    }

    #[tokio::test]
    async fn test_blank_lookup_is_empty_not_error() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        assert!(db.guests().lookup(None, None).await.unwrap().is_empty());
        assert!(db.guests().lookup(Some("  "), Some("")).await.unwrap().is_empty());
        assert!(db.guests().lookup(Some("nobody"), None).await.unwrap().is_empty());
    }
}
