//! Property settings API

use axum::{extract::State, routing::get, Json, Router};
use stayline_core::{CoreError, PropertySettings, ValidationError};

use crate::error::ApiResult;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/api/property", get(fetch).put(update))
}

/// GET /api/property
pub async fn fetch(State(state): State<AppState>) -> ApiResult<Json<PropertySettings>> {
    Ok(Json(state.db.property().get().await?))
}

/// PUT /api/property
pub async fn update(
    State(state): State<AppState>,
    Json(settings): Json<PropertySettings>,
) -> ApiResult<Json<PropertySettings>> {
    validate(&settings)?;
    Ok(Json(state.db.property().put(&settings).await?))
}

fn validate(settings: &PropertySettings) -> Result<(), CoreError> {
    if settings.name.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "name".to_string(),
        }
        .into());
    }
    let slabs = [
        ("gst_rate", settings.gst_rate),
        ("food_gst_rate", settings.food_gst_rate),
        ("other_gst_rate", settings.other_gst_rate),
    ];
    for (field, rate) in slabs {
        if !(0.0..=100.0).contains(&rate) {
            return Err(ValidationError::OutOfRange {
                field: field.to_string(),
                min: 0,
                max: 100,
            }
            .into());
        }
    }
    Ok(())
}
