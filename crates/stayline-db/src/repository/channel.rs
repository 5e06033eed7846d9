//! # Channel Repository
//!
//! OTA connections: status, markup and the stop-sell switch.

use sqlx::{SqliteConnection, SqlitePool};
use stayline_core::{ChannelConnection, ConnectionStatus, Markup};
use tracing::info;

use crate::error::{DbError, DbResult};
use crate::repository::now_text;

#[derive(Debug, sqlx::FromRow)]
struct ChannelRow {
    id: String,
    name: String,
    key: String,
    status: ConnectionStatus,
    markup: Option<String>,
    is_stopped: bool,
}

impl TryFrom<ChannelRow> for ChannelConnection {
    type Error = DbError;

    fn try_from(row: ChannelRow) -> DbResult<Self> {
        let markup: Option<Markup> = row.markup.as_deref().map(serde_json::from_str).transpose()?;
        Ok(ChannelConnection {
            id: row.id,
            name: row.name,
            key: row.key,
            status: row.status,
            markup,
            is_stopped: row.is_stopped,
        })
    }
}

pub(crate) async fn fetch_all(conn: &mut SqliteConnection) -> DbResult<Vec<ChannelConnection>> {
    let rows: Vec<ChannelRow> =
        sqlx::query_as("SELECT id, name, key, status, markup, is_stopped FROM channel_connections ORDER BY id")
            .fetch_all(conn)
            .await?;
    rows.into_iter().map(ChannelConnection::try_from).collect()
}

#[derive(Debug, Clone)]
pub struct ChannelRepository {
    pool: SqlitePool,
}

impl ChannelRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ChannelRepository { pool }
    }

    pub async fn list(&self) -> DbResult<Vec<ChannelConnection>> {
        let mut conn = self.pool.acquire().await?;
        fetch_all(&mut conn).await
    }

    /// Connections the fan-out should deliver to.
    pub async fn connected(&self) -> DbResult<Vec<ChannelConnection>> {
        Ok(self.list().await?.into_iter().filter(ChannelConnection::is_connected).collect())
    }

    /// Creates or replaces a connection.
    pub async fn upsert(&self, connection: &ChannelConnection) -> DbResult<ChannelConnection> {
        let markup = connection.markup.as_ref().map(serde_json::to_string).transpose()?;
        sqlx::query(
            r#"
            INSERT INTO channel_connections (id, name, key, status, markup, is_stopped, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                key = excluded.key,
                status = excluded.status,
                markup = excluded.markup,
                is_stopped = excluded.is_stopped,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&connection.id)
        .bind(&connection.name)
        .bind(&connection.key)
        .bind(connection.status)
        .bind(markup)
        .bind(connection.is_stopped)
        .bind(now_text())
        .execute(&self.pool)
        .await?;

        info!(
            channel = %connection.id,
            status = ?connection.status,
            stopped = connection.is_stopped,
            "Channel connection saved"
        );
        Ok(connection.clone())
    }

    /// Replaces an existing connection.
    pub async fn update(&self, connection: &ChannelConnection) -> DbResult<ChannelConnection> {
        let exists: Option<String> = sqlx::query_scalar("SELECT id FROM channel_connections WHERE id = ?1")
            .bind(&connection.id)
            .fetch_optional(&self.pool)
            .await?;
        if exists.is_none() {
            return Err(DbError::not_found("ChannelConnection", &connection.id));
        }
        self.upsert(connection).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};
    use stayline_core::money::Money;

    fn mmt() -> ChannelConnection {
        ChannelConnection {
            id: "mmt".to_string(),
            name: "MMT".to_string(),
            key: "mkmt_live_7d2f".to_string(),
            status: ConnectionStatus::Connected,
            markup: Some(Markup::Fixed {
                amount: Money::from_major(250),
            }),
            is_stopped: false,
        }
    }

    #[tokio::test]
    async fn test_upsert_round_trip() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.channels().upsert(&mmt()).await.unwrap();

        let listed = db.channels().list().await.unwrap();
        assert_eq!(listed, vec![mmt()]);
    }

    #[tokio::test]
    async fn test_stop_sell_and_disconnect() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.channels().upsert(&mmt()).await.unwrap();

        let mut stopped = mmt();
        stopped.is_stopped = true;
        stopped.status = ConnectionStatus::Disconnected;
        db.channels().update(&stopped).await.unwrap();

        assert!(db.channels().connected().await.unwrap().is_empty());
        assert!(db.channels().list().await.unwrap()[0].is_stopped);
    }

    #[tokio::test]
    async fn test_update_unknown_connection() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        assert!(matches!(
            db.channels().update(&mmt()).await,
            Err(DbError::NotFound { .. })
        ));
    }
}
