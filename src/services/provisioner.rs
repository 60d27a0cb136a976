//! provisioner.rs
//!
//! Materializes one event-seat per venue-seat, pricing each from the event's
//! seat-type price map. Not atomic across seats: a deliberate pragmatic
//! choice, since seat counts may be large and each event-seat is idempotently
//! reconstructible from its venue-seat.

use rust_decimal::Decimal;
use std::collections::HashMap;

use crate::clock;
use crate::domain::{Event, EventSeat, SeatState, Venue, VenueSeat};
use crate::error::{AppError, AppResult};
use crate::store::Store;

pub struct CreateEventRequest {
    pub venue_id: String,
    pub name: String,
    pub start_time: String,
    pub duration_minutes: i64,
    pub artists: Vec<String>,
    pub tags: Vec<String>,
    pub description: Option<String>,
    pub seat_type_prices: HashMap<String, Decimal>,
}

pub async fn create_event(store: &dyn Store, req: CreateEventRequest) -> AppResult<Event> {
    let venue_item = store
        .get(&req.venue_id, "VENUE")
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Venue with ID {} not found", req.venue_id)))?;
    let venue = Venue::from_item(&venue_item).map_err(|e| AppError::Internal(e.to_string()))?;

    for seat_type in &venue.seat_types {
        if !req.seat_type_prices.contains_key(seat_type) {
            return Err(AppError::Validation(format!(
                "Missing price for seat type '{seat_type}'"
            )));
        }
    }

    let event = Event {
        event_id: clock::new_event_id(),
        venue_id: req.venue_id.clone(),
        name: req.name,
        start_time: req.start_time,
        duration_minutes: req.duration_minutes,
        artists: req.artists,
        tags: req.tags,
        description: req.description,
        seat_type_prices: req.seat_type_prices,
        hold_attempts: 0,
        successful_bookings: 0,
        cancellations: 0,
        seats_sold: 0,
    };
    store.put(event.to_item()).await?;

    let venue_seat_items = store.query(&req.venue_id, None).await?;
    let mut seats_created = 0;

    for item in venue_seat_items {
        if item.sk == "VENUE" {
            continue;
        }
        let venue_seat = match VenueSeat::from_item(&item) {
            Ok(seat) => seat,
            Err(e) => {
                tracing::warn!(seat_pos = %item.sk, error = %e, "skipping malformed venue seat");
                continue;
            }
        };
        let Some(price) = event.seat_type_prices.get(&venue_seat.seat_type) else {
            continue;
        };

        let event_seat = EventSeat {
            event_id: event.event_id.clone(),
            seat_pos: venue_seat.seat_pos.clone(),
            row: venue_seat.row,
            seat_num: venue_seat.seat_num,
            seat_type: venue_seat.seat_type,
            seat_state: SeatState::Available,
            booking_id: None,
            holding_id: None,
            hold_ttl: None,
            price: *price,
            updated_at: None,
        };

        match store.put(event_seat.to_item()).await {
            Ok(()) => seats_created += 1,
            Err(e) => {
                tracing::warn!(seat_pos = %venue_seat.seat_pos, error = %e, "failed to create event seat");
            }
        }
    }

    if seats_created == 0 {
        return Err(AppError::Validation("No valid seats".to_string()));
    }

    Ok(event)
}
