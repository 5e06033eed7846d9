//! Guest lookup API
//!
//! Lookup feeds the check-in form's autofill: it is best effort and answers
//! an empty list rather than an error. History drives the repeat-guest
//! badge.

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use stayline_core::{Booking, GuestProfile};
use tracing::warn;

use crate::access::Caller;
use crate::error::ApiResult;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().nest(
        "/api/guest",
        Router::new().route("/lookup", get(lookup)).route("/history", get(history)),
    )
}

#[derive(Debug, Deserialize)]
pub struct LookupQuery {
    name: Option<String>,
    phone: Option<String>,
}

/// GET /api/guest/lookup?name=&phone=
pub async fn lookup(State(state): State<AppState>, Query(q): Query<LookupQuery>) -> Json<Vec<GuestProfile>> {
    match state.db.guests().lookup(q.name.as_deref(), q.phone.as_deref()).await {
        Ok(candidates) => Json(candidates),
        Err(e) => {
            warn!(error = %e, "Guest lookup failed, answering no match");
            Json(Vec::new())
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    name: Option<String>,
    phone: Option<String>,
    exclude_booking_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GuestHistory {
    pub is_repeat_guest: bool,
    pub bookings: Vec<Booking>,
}

/// GET /api/guest/history?name=&phone=&exclude_booking_id=
pub async fn history(
    State(state): State<AppState>,
    caller: Caller,
    Query(q): Query<HistoryQuery>,
) -> ApiResult<Json<GuestHistory>> {
    let bookings = state
        .db
        .bookings()
        .guest_history(q.name.as_deref(), q.phone.as_deref(), q.exclude_booking_id.as_deref())
        .await?;
    Ok(Json(GuestHistory {
        is_repeat_guest: !bookings.is_empty(),
        bookings: caller.view_all(bookings),
    }))
}
