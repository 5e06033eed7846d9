//! # Persistence Backend
//!
//! The seam between the desk's local store and the authoritative server.
//!
//! ## Operation Mapping
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  PersistOp                     │  stayline-db                          │
//! │  ──────────────────────────────┼────────────────────────────────────── │
//! │  CreateBookings { bookings }   │  bookings().insert_bulk(&bookings)    │
//! │  UpdateBooking { booking, v }  │  bookings().update(booking, Some(v))  │
//! │  TransferBooking { id, v, rq,  │  bookings().transfer(id, Some(v), rq, │
//! │                    now }       │                      now)             │
//! │  guest_profile                 │  guests().upsert(&profile)            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//! Every write re-runs the booking engine inside the database transaction,
//! so a rejection here is the server's verdict, not a transport fault.

use async_trait::async_trait;
use stayline_core::{Booking, BookingStore, GuestProfile, PersistOp};
use stayline_db::Database;
use tracing::debug;

use crate::error::SyncResult;

/// Where confirmed bookings live.
///
/// Errors must classify themselves: [`SyncError::Rejected`] for a server
/// verdict, a retryable variant for transport trouble.
///
/// [`SyncError::Rejected`]: crate::SyncError::Rejected
#[async_trait]
pub trait PersistBackend: Send + Sync {
    /// Performs `op` and returns the server's canonical copies.
    async fn persist(&self, op: &PersistOp) -> SyncResult<Vec<Booking>>;

    /// Current server copies of the given bookings. Unknown ids are skipped.
    async fn fetch_bookings(&self, ids: &[String]) -> SyncResult<Vec<Booking>>;

    async fn save_guest(&self, profile: &GuestProfile) -> SyncResult<()>;

    /// The full engine view: inventory, bookings, channels, property.
    async fn load_store(&self) -> SyncResult<BookingStore>;
}

#[async_trait]
impl PersistBackend for Database {
    async fn persist(&self, op: &PersistOp) -> SyncResult<Vec<Booking>> {
        match op {
            PersistOp::CreateBookings { bookings } => {
                debug!(count = bookings.len(), "Persisting new bookings");
                Ok(self.bookings().insert_bulk(bookings).await?)
            }
            PersistOp::UpdateBooking {
                booking,
                expected_version,
            } => {
                debug!(booking_id = %booking.id, expected_version, "Persisting booking update");
                let saved = self
                    .bookings()
                    .update(booking.clone(), Some(*expected_version))
                    .await?;
                Ok(vec![saved])
            }
            PersistOp::TransferBooking {
                booking_id,
                expected_version,
                request,
                now_millis,
            } => {
                debug!(booking_id = %booking_id, now_millis, "Persisting room transfer");
                Ok(self
                    .bookings()
                    .transfer(booking_id, Some(*expected_version), request, *now_millis)
                    .await?)
            }
        }
    }

    async fn fetch_bookings(&self, ids: &[String]) -> SyncResult<Vec<Booking>> {
        let mut found = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(booking) = self.bookings().get(id).await? {
                found.push(booking);
            }
        }
        Ok(found)
    }

    async fn save_guest(&self, profile: &GuestProfile) -> SyncResult<()> {
        self.guests().upsert(profile).await?;
        Ok(())
    }

    async fn load_store(&self) -> SyncResult<BookingStore> {
        Ok(Database::load_store(self).await?)
    }
}
