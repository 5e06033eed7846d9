//! Error types for the front desk API.
//!
//! Every failure leaves the server as `{ "code": ..., "message": ... }`.
//! Engine refusals keep the engine's stable code so the UI can branch on
//! it (`STALE_VERSION` → "refresh and retry", `CHECKOUT_BLOCKED` → show
//! the outstanding balance).
//!
//! ```text
//! NOT_FOUND                                    → 404
//! STALE_VERSION, AVAILABILITY_CONFLICT,
//! ROOM_CONFLICT, ROOM_IN_USE, DUPLICATE        → 409
//! VALIDATION_ERROR, BAD_REQUEST                → 400
//! PERMISSION_DENIED                            → 403
//! CHECKOUT_BLOCKED, INVALID_*, BATCH_TOO_LARGE → 422
//! pool exhausted, connection lost              → 503
//! anything else                                → 500 (details only in the log)
//! ```

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use stayline_core::CoreError;
use stayline_db::DbError;
use tracing::error;

/// Front desk API errors.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Database(#[from] DbError),

    #[error("Invalid request: {0}")]
    BadRequest(String),
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        ApiError::Database(DbError::Rule(err))
    }
}

/// Body of every error response.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        ApiError::BadRequest(msg.into())
    }

    /// HTTP status and stable error code.
    pub fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            ApiError::Database(DbError::Rule(rule)) => (rule_status(rule), rule.code()),
            ApiError::Database(DbError::NotFound { .. }) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            ApiError::Database(DbError::UniqueViolation { .. }) => (StatusCode::CONFLICT, "DUPLICATE"),
            ApiError::Database(DbError::ForeignKeyViolation { .. }) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "INVALID_REFERENCE")
            }
            ApiError::Database(e) if e.is_transient() => (StatusCode::SERVICE_UNAVAILABLE, "UNAVAILABLE"),
            ApiError::Database(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }
}

fn rule_status(rule: &CoreError) -> StatusCode {
    match rule {
        CoreError::BookingNotFound(_)
        | CoreError::RoomTypeNotFound(_)
        | CoreError::RoomNotFound(_)
        | CoreError::FolioItemNotFound(_)
        | CoreError::PaymentNotFound(_) => StatusCode::NOT_FOUND,
        CoreError::StaleVersion { .. }
        | CoreError::AvailabilityConflict { .. }
        | CoreError::RoomConflict { .. }
        | CoreError::RoomInUse { .. } => StatusCode::CONFLICT,
        CoreError::Validation(_) => StatusCode::BAD_REQUEST,
        CoreError::PermissionDenied { .. } => StatusCode::FORBIDDEN,
        CoreError::CheckoutBlocked { .. }
        | CoreError::InvalidStatusTransition { .. }
        | CoreError::InvalidPaymentTransition { .. }
        | CoreError::BatchTooLarge { .. }
        | CoreError::InvalidTransferDate { .. } => StatusCode::UNPROCESSABLE_ENTITY,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        let message = if status.is_server_error() {
            error!(target: "database", error = %self, "Request failed");
            match status {
                StatusCode::SERVICE_UNAVAILABLE => "Database busy, please retry".to_string(),
                _ => "Internal server error".to_string(),
            }
        } else {
            self.to_string()
        };

        let body = ErrorBody {
            code: code.to_string(),
            message,
        };
        (status, Json(body)).into_response()
    }
}

/// Result type for handlers.
pub type ApiResult<T> = Result<T, ApiError>;
