//! Booking API
//!
//! ```text
//! GET  /api/bookings[?from=&to=]       list (optionally one date window)
//! POST /api/bookings                   create one
//! POST /api/bookings/bulk              create a reservation batch
//! PUT  /api/bookings/{id}              replace; If-Match: <timestamp>
//! POST /api/bookings/{id}/transfer     room transfer
//! POST /api/bookings/{id}/checkout     settle and check out
//! ```
//!
//! Creates re-run the availability check against stored inventory, so two
//! desks racing for the last room cannot both win. Identity numbers are
//! masked in every response unless the caller may see them.

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post, put},
    Json, Router,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use stayline_core::ledger::Invoice;
use stayline_core::transfer::TransferRequest;
use stayline_core::{Booking, MAX_ROOMS_PER_RESERVATION};
use tracing::info;

use crate::access::Caller;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().nest(
        "/api/bookings",
        Router::new()
            .route("/", get(list).post(create))
            .route("/bulk", post(create_bulk))
            .route("/{id}", put(update))
            .route("/{id}/transfer", post(transfer))
            .route("/{id}/checkout", post(checkout)),
    )
}

#[derive(Debug, Deserialize)]
pub struct RangeQuery {
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
}

/// GET /api/bookings
pub async fn list(
    State(state): State<AppState>,
    caller: Caller,
    Query(range): Query<RangeQuery>,
) -> ApiResult<Json<Vec<Booking>>> {
    let bookings = match (range.from, range.to) {
        (Some(from), Some(to)) => {
            if from >= to {
                return Err(ApiError::bad_request("from must be before to"));
            }
            state.db.bookings().list_range(from, to).await?
        }
        (None, None) => state.db.bookings().list().await?,
        _ => return Err(ApiError::bad_request("from and to go together")),
    };
    Ok(Json(caller.view_all(bookings)))
}

/// POST /api/bookings
pub async fn create(
    State(state): State<AppState>,
    caller: Caller,
    Json(booking): Json<Booking>,
) -> ApiResult<(StatusCode, Json<Booking>)> {
    let saved = state.db.bookings().insert_bulk(&[booking]).await?;
    let booking = saved
        .into_iter()
        .next()
        .ok_or_else(|| ApiError::bad_request("nothing to create"))?;
    Ok((StatusCode::CREATED, Json(caller.view(booking))))
}

/// POST /api/bookings/bulk
pub async fn create_bulk(
    State(state): State<AppState>,
    caller: Caller,
    Json(bookings): Json<Vec<Booking>>,
) -> ApiResult<(StatusCode, Json<Vec<Booking>>)> {
    if bookings.is_empty() {
        return Err(ApiError::bad_request("a batch needs at least one booking"));
    }
    if bookings.len() > MAX_ROOMS_PER_RESERVATION {
        return Err(stayline_core::CoreError::BatchTooLarge {
            max: MAX_ROOMS_PER_RESERVATION,
            requested: bookings.len(),
        }
        .into());
    }

    let saved = state.db.bookings().insert_bulk(&bookings).await?;
    Ok((StatusCode::CREATED, Json(caller.view_all(saved))))
}

/// PUT /api/bookings/{id}
pub async fn update(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(booking): Json<Booking>,
) -> ApiResult<Json<Booking>> {
    if booking.id != id {
        return Err(ApiError::bad_request(format!(
            "body id {} does not match path id {id}",
            booking.id
        )));
    }
    let expected = if_match(&headers)?;
    let saved = state.db.bookings().update(booking, expected).await?;
    Ok(Json(caller.view(saved)))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferBody {
    #[serde(flatten)]
    request: TransferRequest,
    /// Alternative to the `If-Match` header.
    #[serde(default)]
    expected_version: Option<i64>,
    /// The desk's clock at the moment it applied the transfer locally. Both
    /// sides then stamp the same version and continuation id.
    #[serde(default)]
    now_millis: Option<i64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferResponse {
    /// The record now in the new room.
    pub booking: Booking,
    /// For a mid-stay split, the original cut short at the transfer date.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original: Option<Booking>,
}

/// POST /api/bookings/{id}/transfer
pub async fn transfer(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(body): Json<TransferBody>,
) -> ApiResult<Json<TransferResponse>> {
    let expected = if_match(&headers)?.or(body.expected_version);
    let now = body.now_millis.unwrap_or_else(|| state.clock.now_millis());
    let mut records = state
        .db
        .bookings()
        .transfer(&id, expected, &body.request, now)
        .await?
        .into_iter();

    let first = records
        .next()
        .ok_or_else(|| ApiError::bad_request(format!("transfer of {id} produced no booking")))?;
    let response = match records.next() {
        Some(continuation) => TransferResponse {
            booking: caller.view(continuation),
            original: Some(caller.view(first)),
        },
        None => TransferResponse {
            booking: caller.view(first),
            original: None,
        },
    };
    Ok(Json(response))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutResponse {
    pub booking: Booking,
    pub invoice: Invoice,
}

/// POST /api/bookings/{id}/checkout
pub async fn checkout(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> ApiResult<Json<CheckoutResponse>> {
    let expected = if_match(&headers)?;
    let (booking, invoice) = state
        .db
        .bookings()
        .checkout(&id, expected, state.clock.as_ref())
        .await?;
    info!(booking_id = %id, user = %caller.0.user, "Checkout via API");
    Ok(Json(CheckoutResponse {
        booking: caller.view(booking),
        invoice,
    }))
}

/// Reads `If-Match: <timestamp>`, tolerating ETag quotes.
fn if_match(headers: &HeaderMap) -> ApiResult<Option<i64>> {
    let Some(value) = headers.get(axum::http::header::IF_MATCH) else {
        return Ok(None);
    };
    value
        .to_str()
        .ok()
        .map(|s| s.trim().trim_matches('"'))
        .and_then(|s| s.parse::<i64>().ok())
        .map(Some)
        .ok_or_else(|| ApiError::bad_request("If-Match must be a booking timestamp"))
}
