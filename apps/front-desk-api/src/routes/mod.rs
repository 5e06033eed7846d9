//! Route modules, one per resource.

pub mod bookings;
pub mod connections;
pub mod guests;
pub mod health;
pub mod hotels;
pub mod property;
pub mod room_types;
pub mod rules;

use axum::Router;

use crate::state::AppState;

/// Every `/api` route.
pub fn router() -> Router<AppState> {
    Router::new()
        .merge(health::router())
        .merge(hotels::router())
        .merge(room_types::router())
        .merge(bookings::router())
        .merge(guests::router())
        .merge(property::router())
        .merge(connections::router())
        .merge(rules::router())
}
