//! # Rate Rules Repository
//!
//! The property's yield configuration, stored as one JSON document. Reads
//! return empty rules (base price every night) until the first save.

use sqlx::{SqliteConnection, SqlitePool};
use stayline_core::RateRules;
use tracing::info;

use crate::error::DbResult;
use crate::repository::now_text;

pub(crate) async fn fetch(conn: &mut SqliteConnection) -> DbResult<RateRules> {
    let document: Option<String> = sqlx::query_scalar("SELECT document FROM rate_rules WHERE id = 1")
        .fetch_optional(conn)
        .await?;
    match document {
        Some(json) => Ok(serde_json::from_str(&json)?),
        None => Ok(RateRules::default()),
    }
}

#[derive(Debug, Clone)]
pub struct RateRulesRepository {
    pool: SqlitePool,
}

impl RateRulesRepository {
    pub fn new(pool: SqlitePool) -> Self {
        RateRulesRepository { pool }
    }

    pub async fn get(&self) -> DbResult<RateRules> {
        let mut conn = self.pool.acquire().await?;
        fetch(&mut conn).await
    }

    /// Replaces the whole configuration. Malformed rules never reach the
    /// table.
    pub async fn put(&self, rules: &RateRules) -> DbResult<RateRules> {
        rules.validate()?;
        let document = serde_json::to_string(rules)?;

        sqlx::query(
            r#"
            INSERT INTO rate_rules (id, document, updated_at)
            VALUES (1, ?1, ?2)
            ON CONFLICT(id) DO UPDATE SET
                document = excluded.document,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&document)
        .bind(now_text())
        .execute(&self.pool)
        .await?;

        info!(
            weekly_active = rules.weekly_rules.is_active,
            events = rules.special_events.len(),
            "Rate rules saved"
        );
        Ok(rules.clone())
    }
}
