//! booking.rs
//!
//! Promotes a hold to a booking, and cancels a booking, enforcing tenancy in
//! both directions.

use std::sync::Arc;

use crate::clock;
use crate::domain::{Booking, BookingState, EventSeat, SeatState};
use crate::error::{AppError, AppResult};
use crate::seat_state;
use crate::services::hold::spawn_increment;
use crate::store::{Predicate, Store, StoreError, WriteOp};

const HOLDING_PREFIX: &str = "holding-";

async fn find_hold_by_id(store: &dyn Store, holding_id: &str) -> AppResult<crate::domain::Hold> {
    let mut matches = store.scan_by_attr("holding_id", holding_id).await?;
    matches.retain(|item| item.sk.starts_with(HOLDING_PREFIX));

    if matches.is_empty() {
        return Err(AppError::NotFound(format!("Holding with ID {holding_id} not found")));
    }
    if matches.len() > 1 {
        tracing::warn!(holding_id, count = matches.len(), "multiple holdings found with the same id, using the first");
    }
    crate::domain::Hold::from_item(&matches[0]).map_err(|e| AppError::Internal(e.to_string()))
}

async fn find_booking_by_id(store: &dyn Store, booking_id: &str) -> AppResult<Booking> {
    let matches = store.scan_by_attr("booking_id", booking_id).await?;
    if matches.is_empty() {
        return Err(AppError::NotFound(format!("Booking with ID {booking_id} not found")));
    }
    if matches.len() > 1 {
        tracing::warn!(booking_id, count = matches.len(), "multiple bookings found with the same id, using the first");
    }
    Booking::from_item(&matches[0]).map_err(|e| AppError::Internal(e.to_string()))
}

pub async fn confirm(store: Arc<dyn Store>, holding_id: &str, payment_status: &str) -> AppResult<Booking> {
    if payment_status != "successful" && payment_status != "failed" {
        return Err(AppError::Validation("Payment status must be 'successful' or 'failed'".to_string()));
    }
    if payment_status == "failed" {
        return Err(AppError::Validation("Payment failed. Booking not confirmed.".to_string()));
    }

    let hold_record = find_hold_by_id(store.as_ref(), holding_id).await?;

    store
        .get(&hold_record.event_id, "EVENT")
        .await?
        .ok_or_else(|| AppError::NotFound("Event no longer exists. Booking cannot be confirmed.".to_string()))?;
    store
        .get(&hold_record.user_id, "USER")
        .await?
        .ok_or_else(|| AppError::NotFound("User no longer exists. Booking cannot be confirmed.".to_string()))?;

    if clock::is_expired(&hold_record.created_at, hold_record.ttl_seconds) {
        return Err(AppError::Gone("Holding has expired".to_string()));
    }

    let event_seats = store.query(&hold_record.event_id, None).await?;
    let mut seat_map = std::collections::HashMap::new();
    for item in &event_seats {
        if item.sk == "EVENT" {
            continue;
        }
        if let Ok(seat) = EventSeat::from_item(item) {
            seat_map.insert(seat.seat_pos.clone(), seat);
        }
    }

    let mut invalid = Vec::new();
    for seat_pos in &hold_record.seats {
        match seat_map.get(seat_pos) {
            None => invalid.push(format!("{seat_pos} (seat not found)")),
            Some(seat) if seat.seat_state != SeatState::Held => {
                invalid.push(format!("{seat_pos} (state: {})", seat.seat_state.as_str()))
            }
            Some(seat) if seat.holding_id.as_deref() != Some(holding_id) => {
                invalid.push(format!("{seat_pos} (held by different holding)"))
            }
            Some(_) => {}
        }
    }
    if !invalid.is_empty() {
        return Err(AppError::Conflict(format!("Seats are no longer available for confirmation: {invalid:?}")));
    }

    let booking_id = clock::new_booking_id();
    let now = clock::now_iso();
    let booking = Booking {
        event_id: hold_record.event_id.clone(),
        booking_id: booking_id.clone(),
        booking_date: now.clone(),
        user_id: hold_record.user_id.clone(),
        seats: hold_record.seats.clone(),
        state: BookingState::Confirmed,
        payment_status: payment_status.to_string(),
        cancelled_at: None,
    };

    let mut ops = vec![WriteOp::Put { item: booking.to_item(), predicate: Predicate::NotExists }];
    for seat_pos in &hold_record.seats {
        ops.push(seat_state::confirm_seat(&hold_record.event_id, seat_pos, holding_id, &booking_id, &now));
    }
    ops.push(seat_state::delete_hold(&hold_record.event_id, holding_id));

    match store.transact_write(ops).await {
        Ok(()) => {}
        Err(StoreError::TransactionCancelled(_)) | Err(StoreError::PredicateFailed(_, _)) => {
            return Err(AppError::Conflict("seats no longer held".to_string()));
        }
        Err(e) => return Err(e.into()),
    }

    spawn_increment(store.clone(), hold_record.event_id.clone(), "successful_bookings", 1);
    spawn_increment(store, hold_record.event_id, "seats_sold", hold_record.seats.len() as i64);

    Ok(booking)
}

pub struct CancelOutcome {
    pub event_id: String,
    pub user_id: String,
    pub seats_freed: Vec<String>,
    pub cancelled_at: String,
}

pub async fn cancel(store: Arc<dyn Store>, booking_id: &str) -> AppResult<CancelOutcome> {
    let booking = find_booking_by_id(store.as_ref(), booking_id).await?;

    store
        .get(&booking.event_id, "EVENT")
        .await?
        .ok_or_else(|| AppError::NotFound("Event no longer exists. Booking cannot be cancelled.".to_string()))?;

    if booking.state == BookingState::Cancelled {
        return Err(AppError::Validation("Booking is already cancelled".to_string()));
    }

    let event_seats = store.query(&booking.event_id, None).await?;
    let mut seat_map = std::collections::HashMap::new();
    for item in &event_seats {
        if item.sk == "EVENT" {
            continue;
        }
        if let Ok(seat) = EventSeat::from_item(item) {
            seat_map.insert(seat.seat_pos.clone(), seat);
        }
    }

    let mut invalid = Vec::new();
    for seat_pos in &booking.seats {
        match seat_map.get(seat_pos) {
            None => invalid.push(format!("{seat_pos} (seat not found)")),
            Some(seat) if seat.seat_state != SeatState::Booked => {
                invalid.push(format!("{seat_pos} (state: {})", seat.seat_state.as_str()))
            }
            Some(seat) if seat.booking_id.as_deref() != Some(booking_id) => {
                invalid.push(format!("{seat_pos} (booked by different booking)"))
            }
            Some(_) => {}
        }
    }
    if !invalid.is_empty() {
        return Err(AppError::Conflict(format!("Seats are no longer available for cancellation: {invalid:?}")));
    }

    let now = clock::now_iso();
    let mut ops = Vec::new();
    for seat_pos in &booking.seats {
        ops.push(seat_state::cancel_seat(&booking.event_id, seat_pos, booking_id, &now));
    }
    ops.push(WriteOp::Update {
        pk: booking.event_id.clone(),
        sk: booking.booking_date.clone(),
        set: serde_json::Map::from_iter([
            ("state".to_string(), "cancelled".into()),
            ("cancelled_at".to_string(), now.clone().into()),
        ]),
        remove: vec![],
        predicate: Predicate::AttrEq("state".into(), "confirmed".into())
            .and(Predicate::AttrEq("booking_id".into(), booking_id.into())),
    });

    match store.transact_write(ops).await {
        Ok(()) => {}
        Err(StoreError::TransactionCancelled(_)) | Err(StoreError::PredicateFailed(_, _)) => {
            return Err(AppError::Conflict(
                "seats no longer booked by this booking; booking may have already been cancelled".to_string(),
            ));
        }
        Err(e) => return Err(e.into()),
    }

    spawn_increment(store.clone(), booking.event_id.clone(), "cancellations", 1);
    spawn_increment(store, booking.event_id.clone(), "seats_sold", -(booking.seats.len() as i64));

    Ok(CancelOutcome {
        event_id: booking.event_id,
        user_id: booking.user_id,
        seats_freed: booking.seats,
        cancelled_at: now,
    })
}
