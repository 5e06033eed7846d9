//! Hotel switcher API

use axum::{extract::State, routing::get, Json, Router};
use stayline_core::Hotel;

use crate::error::ApiResult;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/api/hotels", get(list))
}

/// GET /api/hotels
pub async fn list(State(state): State<AppState>) -> ApiResult<Json<Vec<Hotel>>> {
    Ok(Json(state.db.hotels().list().await?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{body_json, get, test_app};

    #[tokio::test]
    async fn test_lists_hotels() {
        let (app, db) = test_app().await;
        db.hotels()
            .upsert(&Hotel {
                id: "h-1".to_string(),
                name: "Hotel Satsangi".to_string(),
                location: "Deoghar".to_string(),
                color: "indigo".to_string(),
            })
            .await
            .unwrap();

        let body = body_json(get(&app, "/api/hotels", &[]).await).await;
        assert_eq!(body[0]["name"], "Hotel Satsangi");
        assert_eq!(body[0]["location"], "Deoghar");
    }
}
