//! Rate rules API
//!
//! ```text
//! GET /api/rules                                   weekly strategy + events
//! PUT /api/rules                                   replace them
//! GET /api/rates?roomTypeId=&from=&to=             sell rate per night
//! ```
//!
//! The calendar prices each night of `[from, to)` with the stored rules,
//! letting a dated manual rate update win over them.

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use chrono::NaiveDate;
use serde::Deserialize;
use stayline_core::rates::rate_calendar;
use stayline_core::{EffectiveRate, RateRules};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Widest calendar one request may ask for.
const MAX_CALENDAR_NIGHTS: i64 = 366;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/rules", get(fetch).put(update))
        .route("/api/rates", get(calendar))
}

/// GET /api/rules
pub async fn fetch(State(state): State<AppState>) -> ApiResult<Json<RateRules>> {
    Ok(Json(state.db.rate_rules().get().await?))
}

/// PUT /api/rules
pub async fn update(State(state): State<AppState>, Json(rules): Json<RateRules>) -> ApiResult<Json<RateRules>> {
    Ok(Json(state.db.rate_rules().put(&rules).await?))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarQuery {
    room_type_id: String,
    from: NaiveDate,
    to: NaiveDate,
}

/// GET /api/rates
pub async fn calendar(
    State(state): State<AppState>,
    Query(query): Query<CalendarQuery>,
) -> ApiResult<Json<Vec<EffectiveRate>>> {
    let nights = (query.to - query.from).num_days();
    if nights <= 0 {
        return Err(ApiError::bad_request("from must be before to"));
    }
    if nights > MAX_CALENDAR_NIGHTS {
        return Err(ApiError::bad_request(format!(
            "at most {MAX_CALENDAR_NIGHTS} nights per request"
        )));
    }

    let store = state.db.load_store().await?;
    let room_type = store.require_room_type(&query.room_type_id)?;
    Ok(Json(rate_calendar(&store, room_type, query.from, query.to)))
}

#[cfg(test)]
mod tests {
    use crate::test_support::{body_json, get, send, test_app};
    use axum::http::{Method, StatusCode};
    use serde_json::json;

    fn rules() -> serde_json::Value {
        json!({
            "weeklyRules": {
                "isActive": true,
                "activeDays": [5, 6],
                "modifier": { "type": "multiplier", "bps": 12000 }
            },
            "specialEvents": [{
                "id": "ev-1",
                "name": "Shravani Mela",
                "startDate": "2025-07-11",
                "endDate": "2025-07-12",
                "modifier": { "type": "fixed", "amount": 150000 }
            }]
        })
    }

    #[tokio::test]
    async fn test_rules_default_then_saved() {
        let (app, _db) = test_app().await;
        let body = body_json(get(&app, "/api/rules", &[]).await).await;
        assert_eq!(body["weeklyRules"]["isActive"], false);
        assert_eq!(body["specialEvents"], json!([]));

        let res = send(&app, Method::PUT, "/api/rules", Some(rules()), &[]).await;
        assert_eq!(res.status(), StatusCode::OK);
        let body = body_json(get(&app, "/api/rules", &[]).await).await;
        assert_eq!(body, rules());
    }

    #[tokio::test]
    async fn test_rejects_malformed_rules() {
        let (app, db) = test_app().await;
        let mut bad = rules();
        bad["weeklyRules"]["activeDays"] = json!([7]);
        let res = send(&app, Method::PUT, "/api/rules", Some(bad), &[]).await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(res).await["code"], "VALIDATION_ERROR");
        assert!(!db.rate_rules().get().await.unwrap().weekly_rules.is_active);
    }

    #[tokio::test]
    async fn test_calendar_applies_rules_within_bounds() {
        let (app, _db) = test_app().await;
        send(&app, Method::PUT, "/api/rules", Some(rules()), &[]).await;

        // Thu 10th, Fri 11th and Sat 12th (event), Sun 13th
        let res = get(&app, "/api/rates?roomTypeId=rt-1&from=2025-07-10&to=2025-07-14", &[]).await;
        assert_eq!(res.status(), StatusCode::OK);
        let nights = body_json(res).await;
        let nights = nights.as_array().unwrap();
        assert_eq!(nights.len(), 4);

        assert_eq!(nights[0]["price"], 100_000);
        assert_eq!(nights[0]["appliedRule"], json!(null));
        // ₹1000 + ₹1500 is over the ₹2000 ceiling
        assert_eq!(nights[1]["price"], 200_000);
        assert_eq!(nights[1]["appliedRule"], "Shravani Mela");
        assert_eq!(nights[2]["appliedRule"], "Shravani Mela");
        assert_eq!(nights[3]["price"], 100_000);
    }

    #[tokio::test]
    async fn test_calendar_bad_requests() {
        let (app, _db) = test_app().await;
        let res = get(&app, "/api/rates?roomTypeId=rt-1&from=2025-07-14&to=2025-07-10", &[]).await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);

        let res = get(&app, "/api/rates?roomTypeId=rt-1&from=2025-01-01&to=2026-06-01", &[]).await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);

        let res = get(&app, "/api/rates?roomTypeId=rt-9&from=2025-07-10&to=2025-07-11", &[]).await;
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }
}
