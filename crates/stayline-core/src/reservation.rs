//! # Reservation Batches
//!
//! Builds the bookings of one new-booking submission: up to
//! [`MAX_ROOMS_PER_RESERVATION`] rows, each a room type and date range.
//!
//! ```text
//!   rows ──► validate sizes & dates ──► batch availability (rows compete
//!            with each other)       ──► assign rooms in order
//!            (requested room if free, else first free, never one taken
//!            earlier in the batch) ──► price (base + channel markup)
//!                                   ──► Vec<Booking> sharing reservation_id
//! ```
//! Nothing is written to the store; the caller commits the bookings.

use std::collections::{BTreeMap, HashSet};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::allocator::{allocate_room, is_room_free};
use crate::availability::{batch_availability, CandidateStay};
use crate::dates::{billable_nights, Clock, StayRange};
use crate::error::{CoreError, CoreResult};
use crate::ledger::update_extra_beds;
use crate::pricing::stay_price;
use crate::store::BookingStore;
use crate::types::{Booking, BookingSource, BookingStatus, GuestDetails};
use crate::validation::{validate_batch_size, validate_guest_name};
use crate::MAX_ROOMS_PER_RESERVATION;

/// One room of a reservation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReservationRow {
    pub room_type_id: String,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    /// A specific room asked for at the desk. Honoured when free.
    #[serde(default)]
    pub room_number: Option<String>,
    #[serde(default)]
    pub pax: Option<u32>,
    #[serde(default)]
    pub extra_beds: u32,
}

impl ReservationRow {
    fn candidate(&self) -> CandidateStay {
        CandidateStay {
            room_type_id: self.room_type_id.clone(),
            check_in: self.check_in,
            check_out: self.check_out,
        }
    }
}

/// A new-booking submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReservationRequest {
    pub guest_name: String,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub guest_details: Option<GuestDetails>,
    #[serde(default = "direct")]
    pub source: BookingSource,
    #[serde(default)]
    pub special_requests: Option<String>,
    #[serde(default, rename = "isVIP")]
    pub is_vip: bool,
    pub rooms: Vec<ReservationRow>,
}

fn direct() -> BookingSource {
    BookingSource::Direct
}

fn validate_rows(store: &BookingStore, rows: &[ReservationRow]) -> CoreResult<()> {
    if rows.len() > MAX_ROOMS_PER_RESERVATION {
        return Err(CoreError::BatchTooLarge {
            max: MAX_ROOMS_PER_RESERVATION,
            requested: rows.len(),
        });
    }
    validate_batch_size(rows.len())?;

    for row in rows {
        StayRange::new(row.check_in, row.check_out)?;
        store.require_room_type(&row.room_type_id)?;
    }

    let candidates: Vec<CandidateStay> = rows.iter().map(ReservationRow::candidate).collect();
    let availability = batch_availability(store, &candidates);
    if let Some(row) = rows.iter().zip(&availability).find(|(_, free)| **free == 0).map(|(row, _)| row) {
        return Err(CoreError::AvailabilityConflict {
            room_type_id: row.room_type_id.clone(),
            check_in: row.check_in.to_string(),
            check_out: row.check_out.to_string(),
        });
    }
    Ok(())
}

/// Builds the bookings of a reservation.
///
/// Ids are `{source slug}-{now_millis}-{row index}`; all rows share
/// `reservation_id = res-{now_millis}`.
pub fn create_reservation(
    store: &BookingStore,
    request: &ReservationRequest,
    clock: &dyn Clock,
) -> CoreResult<Vec<Booking>> {
    validate_guest_name(&request.guest_name)?;
    validate_rows(store, &request.rooms)?;

    let now = clock.now();
    let now_millis = now.timestamp_millis();
    let reservation_id = format!("res-{}", now_millis);
    let slug = request.source.slug();

    let mut details = request.guest_details.clone().unwrap_or_default();
    details.name = Some(request.guest_name.trim().to_string());
    if request.phone_number.is_some() {
        details.phone_number = request.phone_number.clone();
    }
    if request.email.is_some() {
        details.email = request.email.clone();
    }

    let mut taken: HashSet<String> = HashSet::new();
    let mut bookings = Vec::with_capacity(request.rooms.len());

    for (idx, row) in request.rooms.iter().enumerate() {
        let room_type = store.require_room_type(&row.room_type_id)?;

        let requested = row
            .room_number
            .as_deref()
            .filter(|room| room_type.has_room(room))
            .filter(|room| !taken.contains(*room))
            .filter(|room| is_room_free(store, room, row.check_in, row.check_out, None))
            .map(str::to_string);
        let room_number = match requested {
            Some(room) => Some(room),
            None => allocate_room(store, room_type, row.check_in, row.check_out, &taken).into_room(),
        };
        if let Some(room) = &room_number {
            taken.insert(room.clone());
        }

        let nights = billable_nights(row.check_in, row.check_out);
        let mut booking = Booking {
            id: format!("{}-{}-{}", slug, now_millis, idx),
            reservation_id: Some(reservation_id.clone()),
            room_type_id: row.room_type_id.clone(),
            room_number,
            guest_name: request.guest_name.trim().to_string(),
            source: request.source,
            status: BookingStatus::Confirmed,
            timestamp: now_millis,
            check_in: row.check_in,
            check_out: row.check_out,
            amount: stay_price(room_type, request.source, store.connections(), nights),
            rate_override: None,
            channel_sync: BTreeMap::new(),
            guest_details: Some(details.clone()),
            accessory_guests: Vec::new(),
            number_of_rooms: Some(request.rooms.len() as u32),
            pax: row.pax,
            extra_beds: 0,
            special_requests: request.special_requests.clone(),
            rejection_reason: None,
            is_vip: request.is_vip,
            is_settled: false,
            folio: Vec::new(),
            payments: Vec::new(),
        };
        if row.extra_beds > 0 {
            update_extra_beds(&mut booking, room_type, row.extra_beds, now);
        }
        bookings.push(booking);
    }

    Ok(bookings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::money::Money;
    use crate::test_support::{booking, clock, d, deluxe, suite};
    use crate::types::{ChannelConnection, ConnectionStatus, Markup};

    fn row(room_type: &str, room: Option<&str>) -> ReservationRow {
        ReservationRow {
            room_type_id: room_type.to_string(),
            check_in: d("2024-06-01"),
            check_out: d("2024-06-03"),
            room_number: room.map(str::to_string),
            pax: Some(2),
            extra_beds: 0,
        }
    }

    fn request(rooms: Vec<ReservationRow>) -> ReservationRequest {
        ReservationRequest {
            guest_name: "Asha Rao".to_string(),
            phone_number: Some("9876543210".to_string()),
            email: None,
            guest_details: None,
            source: BookingSource::Direct,
            special_requests: None,
            is_vip: false,
            rooms,
        }
    }

    fn store() -> BookingStore {
        BookingStore::new(vec![deluxe(), suite()])
    }

    #[test]
    fn test_batch_gets_distinct_rooms_and_shared_reservation() {
        let clock = clock("2024-05-20");
        let rooms = create_reservation(&store(), &request(vec![row("deluxe", None), row("deluxe", None)]), &clock).unwrap();

        let numbers: Vec<_> = rooms.iter().map(|b| b.room_number.as_deref().unwrap()).collect();
        assert_eq!(numbers, vec!["D-101", "D-102"]);

        let millis = clock.now_millis();
        assert_eq!(rooms[0].id, format!("direct-{}-0", millis));
        assert_eq!(rooms[1].id, format!("direct-{}-1", millis));
        assert!(rooms.iter().all(|b| b.reservation_id == Some(format!("res-{}", millis))));
        assert!(rooms.iter().all(|b| b.number_of_rooms == Some(2)));
        assert_eq!(rooms[0].amount, Money::from_major(2000));
        assert_eq!(
            rooms[0].guest_details.as_ref().and_then(|g| g.phone_number.as_deref()),
            Some("9876543210")
        );
    }

    #[test]
    fn test_batch_cannot_overbook_itself() {
        let mut store = store();
        store.upsert_booking(booking("a", "D-101", "2024-06-01", "2024-06-03"));
        let err = create_reservation(&store, &request(vec![row("deluxe", None), row("deluxe", None)]), &clock("2024-05-20"))
            .unwrap_err();
        assert!(matches!(err, CoreError::AvailabilityConflict { .. }));
    }

    #[test]
    fn test_requested_room_honoured_when_free() {
        let rooms = create_reservation(&store(), &request(vec![row("suite", Some("S-203"))]), &clock("2024-05-20")).unwrap();
        assert_eq!(rooms[0].room_number.as_deref(), Some("S-203"));

        // Asking for the same room twice falls back to the allocator
        let rooms = create_reservation(
            &store(),
            &request(vec![row("suite", Some("S-202")), row("suite", Some("S-202"))]),
            &clock("2024-05-20"),
        )
        .unwrap();
        assert_eq!(rooms[0].room_number.as_deref(), Some("S-202"));
        assert_eq!(rooms[1].room_number.as_deref(), Some("S-201"));
    }

    #[test]
    fn test_batch_size_limits() {
        let too_many: Vec<_> = (0..11).map(|_| row("suite", None)).collect();
        assert!(matches!(
            create_reservation(&store(), &request(too_many), &clock("2024-05-20")),
            Err(CoreError::BatchTooLarge { max: 10, requested: 11 })
        ));
        assert!(create_reservation(&store(), &request(vec![]), &clock("2024-05-20")).is_err());
    }

    #[test]
    fn test_channel_markup_and_extra_beds() {
        let store = store().with_connections(vec![ChannelConnection {
            id: "conn-1".to_string(),
            name: "Booking.com".to_string(),
            key: String::new(),
            status: ConnectionStatus::Connected,
            markup: Some(Markup::Percentage { bps: 1500 }),
            is_stopped: false,
        }]);
        let mut req = request(vec![ReservationRow {
            extra_beds: 1,
            ..row("deluxe", None)
        }]);
        req.source = BookingSource::BookingCom;

        let rooms = create_reservation(&store, &req, &clock("2024-05-20")).unwrap();
        assert!(rooms[0].id.starts_with("bookingcom-"));
        assert_eq!(rooms[0].amount, Money::from_major(2300));
        assert_eq!(rooms[0].extra_beds, 1);
        assert_eq!(rooms[0].folio[0].description, "Extra Bed Setup x1");
    }

    #[test]
    fn test_invalid_dates_rejected() {
        let bad = ReservationRow {
            check_out: d("2024-06-01"),
            ..row("deluxe", None)
        };
        assert!(matches!(
            create_reservation(&store(), &request(vec![bad]), &clock("2024-05-20")),
            Err(CoreError::Validation(_))
        ));
    }
}
