//! Room inventory API
//!
//! Room numbers are validated across the whole inventory, and a room an
//! active booking still holds cannot be removed (`409 ROOM_IN_USE`).

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};
use stayline_core::RoomType;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().nest(
        "/api/room-types",
        Router::new()
            .route("/", get(list).post(create))
            .route("/{id}", put(update).delete(delete)),
    )
}

/// GET /api/room-types
pub async fn list(State(state): State<AppState>) -> ApiResult<Json<Vec<RoomType>>> {
    Ok(Json(state.db.room_types().list().await?))
}

/// POST /api/room-types
pub async fn create(
    State(state): State<AppState>,
    Json(room_type): Json<RoomType>,
) -> ApiResult<(StatusCode, Json<RoomType>)> {
    let saved = state.db.room_types().insert(&room_type).await?;
    Ok((StatusCode::CREATED, Json(saved)))
}

/// PUT /api/room-types/{id}
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(room_type): Json<RoomType>,
) -> ApiResult<Json<RoomType>> {
    if room_type.id != id {
        return Err(ApiError::bad_request(format!(
            "body id {} does not match path id {id}",
            room_type.id
        )));
    }
    let today = state.clock.today();
    Ok(Json(state.db.room_types().update(&room_type, today).await?))
}

/// DELETE /api/room-types/{id}
pub async fn delete(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<StatusCode> {
    let today = state.clock.today();
    state.db.room_types().delete(&id, today).await?;
    Ok(StatusCode::NO_CONTENT)
}
