//! # Stayline Front Desk API
//!
//! REST server the front-desk UI persists through.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Front Desk API                                   │
//! │                                                                         │
//! │  ┌────────────────┐  ┌────────────────┐  ┌────────────────────────────┐│
//! │  │  /bookings     │  │  /room-types   │  │  /guest                    ││
//! │  │                │  │                │  │                            ││
//! │  │ • list/create  │  │ • CRUD with    │  │ • lookup (best effort)     ││
//! │  │ • bulk         │  │   ROOM_IN_USE  │  │ • history                  ││
//! │  │ • If-Match PUT │  │   guard        │  │                            ││
//! │  │ • transfer     │  └────────────────┘  └────────────────────────────┘│
//! │  │ • checkout     │                                                    │
//! │  └────────────────┘  ┌────────────────┐  ┌────────────────────────────┐│
//! │                      │  /property     │  │  /connections, /hotels,    ││
//! │                      │  /rules /rates │  │  /health                   ││
//! │                      └────────────────┘  └────────────────────────────┘│
//! │                                                                         │
//! │  Handlers ──► stayline-db repositories ──► stayline-core rules          │
//! │  Errors   ──► { code, message } with the engine's stable code           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration
//! Environment variables:
//! - `STAYLINE_API_PORT` - HTTP port (default: 8080)
//! - `STAYLINE_DB_PATH` - SQLite file (default: stayline.db)
//! - `STAYLINE_DB_MAX_CONNECTIONS` - pool size (default: 5)
//! - `RUST_LOG` - log filter (default: info,stayline=debug,sqlx=warn)

pub mod access;
pub mod config;
pub mod error;
pub mod routes;
pub mod state;

#[cfg(test)]
pub(crate) mod test_support;

// Re-exports
pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use state::AppState;

use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Builds the full application router.
pub fn app(state: AppState) -> Router {
    routes::router()
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
