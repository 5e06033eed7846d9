//! OTA channel connection API

use axum::{
    extract::{Path, State},
    routing::{get, put},
    Json, Router,
};
use stayline_core::ChannelConnection;
use tracing::info;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().nest(
        "/api/connections",
        Router::new().route("/", get(list)).route("/{id}", put(update)),
    )
}

/// GET /api/connections
pub async fn list(State(state): State<AppState>) -> ApiResult<Json<Vec<ChannelConnection>>> {
    Ok(Json(state.db.channels().list().await?))
}

/// PUT /api/connections/{id}
///
/// Toggling `isStopped` here is how stop-sell is switched on and off.
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(connection): Json<ChannelConnection>,
) -> ApiResult<Json<ChannelConnection>> {
    if connection.id != id {
        return Err(ApiError::bad_request(format!(
            "body id {} does not match path id {id}",
            connection.id
        )));
    }
    let saved = state.db.channels().update(&connection).await?;
    info!(channel = %saved.name, stopped = saved.is_stopped, "Channel connection changed");
    Ok(Json(saved))
}
