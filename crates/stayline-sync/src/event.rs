//! # Desk Events
//!
//! Everything the background tasks report back to the front desk UI.
//!
//! ```text
//! Reconciler ──► Persisted / Refreshed / PersistFailure ──┐
//!                                                         ├──► mpsc ──► UI toast / grid refresh
//! ChannelNotifier ──► ChannelUpdate ──────────────────────┘
//! ```

use serde::Serialize;
use stayline_core::ChannelStatus;

/// A notification from the desk services.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DeskEvent {
    /// The server confirmed these bookings; local copies now match it.
    Persisted { booking_ids: Vec<String> },

    /// The server refused a write. Local state was replaced with the
    /// server's copies; the clerk must look again.
    Refreshed {
        booking_ids: Vec<String>,
        code: String,
        message: String,
    },

    /// Persisting failed after all retries. The local change is kept and
    /// stays unsynced.
    PersistFailure { booking_ids: Vec<String>, reason: String },

    /// One channel's delivery status for a booking or rate update.
    ChannelUpdate {
        event_id: String,
        channel: String,
        status: ChannelStatus,
    },
}

impl DeskEvent {
    /// True for events the clerk should see as an error toast.
    pub fn is_failure(&self) -> bool {
        match self {
            DeskEvent::Refreshed { .. } | DeskEvent::PersistFailure { .. } => true,
            DeskEvent::ChannelUpdate { status, .. } => *status == ChannelStatus::Error,
            DeskEvent::Persisted { .. } => false,
        }
    }
}
