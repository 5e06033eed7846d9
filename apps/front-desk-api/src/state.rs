//! Shared application state.

use std::sync::Arc;

use stayline_core::Clock;
use stayline_db::Database;

/// What every handler can reach. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    /// "Today" for inventory checks and checkout stamps.
    pub clock: Arc<dyn Clock>,
}

impl AppState {
    pub fn new(db: Database, clock: Arc<dyn Clock>) -> Self {
        AppState { db, clock }
    }
}
