//! Caller identity extractor.
//!
//! The front desk sits behind the property's login; the API only needs to
//! know who is asking and at what permission level, which arrive as
//! headers. Without them the caller is an anonymous clerk (level 1), who
//! sees identity numbers masked.
//!
//! ```text
//! X-Stayline-User:  ravi
//! X-Stayline-Level: 2        → AccessContext { user: "ravi", level: 2 }
//! ```

use axum::{extract::FromRequestParts, http::request::Parts};
use stayline_core::access::AccessContext;
use stayline_core::Booking;

use crate::error::ApiError;

pub const USER_HEADER: &str = "x-stayline-user";
pub const LEVEL_HEADER: &str = "x-stayline-level";

const ANONYMOUS: &str = "anonymous";

/// The caller of a request.
#[derive(Debug, Clone)]
pub struct Caller(pub AccessContext);

impl Caller {
    /// `booking` as this caller may see it.
    pub fn view(&self, booking: Booking) -> Booking {
        if self.0.can_view_pii() {
            booking
        } else {
            booking.redacted()
        }
    }

    pub fn view_all(&self, bookings: Vec<Booking>) -> Vec<Booking> {
        bookings.into_iter().map(|b| self.view(b)).collect()
    }
}

impl<S: Send + Sync> FromRequestParts<S> for Caller {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = |name: &str| -> Result<Option<String>, ApiError> {
            match parts.headers.get(name) {
                None => Ok(None),
                Some(value) => value
                    .to_str()
                    .map(|s| Some(s.trim().to_string()))
                    .map_err(|_| ApiError::bad_request(format!("{name} is not valid text"))),
            }
        };

        let user = header(USER_HEADER)?
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| ANONYMOUS.to_string());
        let level = match header(LEVEL_HEADER)? {
            None => 1,
            Some(raw) => raw
                .parse::<u8>()
                .map_err(|_| ApiError::bad_request(format!("{LEVEL_HEADER} must be a small number")))?,
        };

        Ok(Caller(AccessContext::new(user, level)))
    }
}
