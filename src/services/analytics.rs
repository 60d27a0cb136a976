//! analytics.rs
//!
//! Non-mutating scans over an event's partition, producing the derived
//! metrics dashboard clients read. All money fields are
//! `rust_decimal::Decimal`; only display-time formatting rounds.

use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::HashMap;

use crate::domain::{Booking, BookingState, Event, EventSeat, SeatState, Venue};
use crate::error::{AppError, AppResult};
use crate::store::Store;

#[derive(Debug, Clone, Serialize)]
pub struct EventAnalytics {
    pub event_id: String,
    pub event_name: String,
    pub venue_id: String,
    pub venue_name: String,
    pub total_seats: i64,
    pub seats_available: i64,
    pub seats_held: i64,
    pub seats_booked: i64,
    pub seats_sold: i64,
    pub capacity_utilization: Decimal,
    pub total_bookings: i64,
    pub successful_bookings: i64,
    pub cancelled_bookings: i64,
    pub hold_attempts: i64,
    pub failed_holds: i64,
    pub revenue_generated: Decimal,
    pub revenue_by_seat_type: HashMap<String, Decimal>,
    pub average_booking_value: Decimal,
    pub booking_success_rate: Decimal,
    pub hold_success_rate: Decimal,
    pub cancellation_rate: Decimal,
    pub last_booking_time: Option<String>,
}

fn round2(d: Decimal) -> Decimal {
    d.round_dp(2)
}

fn percent(numerator: i64, denominator: i64) -> Decimal {
    if denominator == 0 {
        return Decimal::ZERO;
    }
    round2(Decimal::from(numerator) * Decimal::from(100) / Decimal::from(denominator))
}

pub async fn event_analytics(store: &dyn Store, event_id: &str) -> AppResult<EventAnalytics> {
    let event_item = store
        .get(event_id, "EVENT")
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Event with ID {event_id} not found")))?;
    let event = Event::from_item(&event_item).map_err(|e| AppError::Internal(e.to_string()))?;

    let venue_name = match store.get(&event.venue_id, "VENUE").await? {
        Some(item) => Venue::from_item(&item).map(|v| v.name).unwrap_or_else(|_| "Unknown Venue".to_string()),
        None => "Unknown Venue".to_string(),
    };

    let seat_items = store.query(event_id, None).await?;
    let mut seats_available = 0i64;
    let mut seats_held = 0i64;
    let mut seats_booked = 0i64;
    let mut total_seats = 0i64;
    let mut revenue_generated = Decimal::ZERO;
    let mut revenue_by_seat_type: HashMap<String, Decimal> = HashMap::new();

    for item in &seat_items {
        if item.sk == "EVENT" {
            continue;
        }
        let Ok(seat) = EventSeat::from_item(item) else { continue };
        total_seats += 1;
        match seat.seat_state {
            SeatState::Available => seats_available += 1,
            SeatState::Held => seats_held += 1,
            SeatState::Booked => {
                seats_booked += 1;
                revenue_generated += seat.price;
                *revenue_by_seat_type.entry(seat.seat_type.clone()).or_insert(Decimal::ZERO) += seat.price;
            }
        }
    }

    let booking_items = store.query(event_id, Some("202")).await?;
    let mut bookings = Vec::new();
    for item in &booking_items {
        if let Ok(booking) = Booking::from_item(item) {
            bookings.push(booking);
        }
    }

    let total_bookings = bookings.len() as i64;
    let successful_bookings = bookings.iter().filter(|b| b.state == BookingState::Confirmed).count() as i64;
    let cancelled_bookings = bookings.iter().filter(|b| b.state == BookingState::Cancelled).count() as i64;
    let last_booking_time = bookings.iter().map(|b| b.booking_date.clone()).max();

    let failed_holds = (event.hold_attempts - successful_bookings).max(0);

    let capacity_utilization =
        if total_seats > 0 { round2(Decimal::from(seats_booked) * Decimal::from(100) / Decimal::from(total_seats)) } else { Decimal::ZERO };

    let average_booking_value = if successful_bookings > 0 {
        round2(revenue_generated / Decimal::from(successful_bookings))
    } else {
        Decimal::ZERO
    };

    Ok(EventAnalytics {
        event_id: event.event_id.clone(),
        event_name: event.name.clone(),
        venue_id: event.venue_id.clone(),
        venue_name,
        total_seats,
        seats_available,
        seats_held,
        seats_booked,
        seats_sold: event.seats_sold,
        capacity_utilization,
        total_bookings,
        successful_bookings,
        cancelled_bookings,
        hold_attempts: event.hold_attempts,
        failed_holds,
        revenue_generated: round2(revenue_generated),
        revenue_by_seat_type: revenue_by_seat_type.into_iter().map(|(k, v)| (k, round2(v))).collect(),
        average_booking_value,
        booking_success_rate: percent(successful_bookings, total_bookings),
        hold_success_rate: percent(successful_bookings, event.hold_attempts),
        cancellation_rate: percent(cancelled_bookings, total_bookings),
        last_booking_time,
    })
}

/// Seat-level analytics, filtered by `seat_type`/`seat_state` and paginated
/// in-memory by `(offset, limit)`.
pub async fn seats_filtered(
    store: &dyn Store,
    event_id: &str,
    seat_type: Option<&str>,
    seat_state: Option<&str>,
    offset: usize,
    limit: usize,
) -> AppResult<Vec<EventSeat>> {
    store.get(event_id, "EVENT").await?.ok_or_else(|| AppError::NotFound(format!("Event with ID {event_id} not found")))?;

    let seat_items = store.query(event_id, None).await?;
    let mut seats: Vec<EventSeat> = seat_items
        .iter()
        .filter(|item| item.sk != "EVENT")
        .filter_map(|item| EventSeat::from_item(item).ok())
        .filter(|seat| seat_type.map(|t| seat.seat_type == t).unwrap_or(true))
        .filter(|seat| seat_state.map(|s| seat.seat_state.as_str() == s).unwrap_or(true))
        .collect();
    seats.sort_by(|a, b| a.seat_pos.cmp(&b.seat_pos));
    Ok(seats.into_iter().skip(offset).take(limit).collect())
}

/// Booking-level analytics, filtered by `state` and paginated, sorted by
/// `booking_date` descending.
pub async fn bookings_filtered(
    store: &dyn Store,
    event_id: &str,
    state: Option<&str>,
    offset: usize,
    limit: usize,
) -> AppResult<Vec<Booking>> {
    store.get(event_id, "EVENT").await?.ok_or_else(|| AppError::NotFound(format!("Event with ID {event_id} not found")))?;

    let booking_items = store.query(event_id, Some("202")).await?;
    let mut bookings: Vec<Booking> = booking_items
        .iter()
        .filter_map(|item| Booking::from_item(item).ok())
        .filter(|b| state.map(|s| b.state.as_str() == s).unwrap_or(true))
        .collect();
    bookings.sort_by(|a, b| b.booking_date.cmp(&a.booking_date));
    Ok(bookings.into_iter().skip(offset).take(limit).collect())
}
