//! Channel pricing.
//!
//! Direct bookings pay the room type's base price. OTA bookings pay the
//! base price plus the markup configured on the matching channel
//! connection (matched by [`BookingSource::label`]).

use crate::money::Money;
use crate::types::{BookingSource, ChannelConnection, Markup, RoomType};

/// `base` with a channel markup applied.
///
/// ```rust
/// use stayline_core::money::Money;
/// use stayline_core::pricing::apply_markup;
/// use stayline_core::types::Markup;
///
/// let base = Money::from_major(2000);
/// assert_eq!(apply_markup(base, Some(Markup::Percentage { bps: 1500 })), Money::from_major(2300));
/// assert_eq!(apply_markup(base, Some(Markup::Fixed { amount: Money::from_major(250) })), Money::from_major(2250));
/// ```
pub fn apply_markup(base: Money, markup: Option<Markup>) -> Money {
    match markup {
        None => base,
        Some(Markup::Percentage { bps }) => base + base.percentage_of(bps),
        Some(Markup::Fixed { amount }) => base + amount,
    }
}

/// The connection a booking source sells through, if any.
pub fn connection_for<'a>(source: BookingSource, connections: &'a [ChannelConnection]) -> Option<&'a ChannelConnection> {
    if source.is_direct() {
        return None;
    }
    connections.iter().find(|c| c.name == source.label())
}

/// Nightly sell rate of `room_type` through `source`.
pub fn nightly_rate(room_type: &RoomType, source: BookingSource, connections: &[ChannelConnection]) -> Money {
    let markup = connection_for(source, connections).and_then(|c| c.markup);
    apply_markup(room_type.base_price, markup)
}

/// Total quoted for `nights` nights.
pub fn stay_price(room_type: &RoomType, source: BookingSource, connections: &[ChannelConnection], nights: i64) -> Money {
    nightly_rate(room_type, source, connections) * nights
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::deluxe;
    use crate::types::ConnectionStatus;

    fn mmt(markup: Option<Markup>) -> ChannelConnection {
        ChannelConnection {
            id: "conn-mmt".to_string(),
            name: "MMT".to_string(),
            key: String::new(),
            status: ConnectionStatus::Connected,
            markup,
            is_stopped: false,
        }
    }

    #[test]
    fn test_direct_ignores_markup() {
        let connections = [mmt(Some(Markup::Percentage { bps: 1000 }))];
        assert_eq!(
            nightly_rate(&deluxe(), BookingSource::Direct, &connections),
            Money::from_major(1000)
        );
    }

    #[test]
    fn test_channel_markup_applies() {
        let connections = [mmt(Some(Markup::Percentage { bps: 1000 }))];
        assert_eq!(
            stay_price(&deluxe(), BookingSource::Mmt, &connections, 3),
            Money::from_major(3300)
        );
    }

    #[test]
    fn test_unknown_channel_sells_at_base() {
        let connections = [mmt(Some(Markup::Fixed {
            amount: Money::from_major(100),
        }))];
        assert_eq!(
            nightly_rate(&deluxe(), BookingSource::Expedia, &connections),
            Money::from_major(1000)
        );
        assert_eq!(
            nightly_rate(&deluxe(), BookingSource::Mmt, &connections),
            Money::from_major(1100)
        );
    }
}
