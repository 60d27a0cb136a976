//! bookings.rs
//!
//! Confirm promotes a hold to a booking; cancel reverses a booking back to
//! available seats. Both take their id from the path, matching a holder or
//! booking owner acting on their own resource.

use axum::{
    extract::{Path, State},
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::AppResult;
use crate::services::booking;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/holdings/{holding_id}/confirm", post(confirm_booking))
        .route("/bookings/{booking_id}/cancel", post(cancel_booking))
}

#[derive(Deserialize)]
struct ConfirmRequest {
    payment_status: String,
}

#[derive(Serialize)]
struct BookingResponse {
    booking_id: String,
    event_id: String,
    user_id: String,
    seats: Vec<String>,
    booking_date: String,
    state: String,
    payment_status: String,
}

async fn confirm_booking(
    State(state): State<Arc<AppState>>,
    Path(holding_id): Path<String>,
    Json(req): Json<ConfirmRequest>,
) -> AppResult<Json<BookingResponse>> {
    let booking = booking::confirm(state.store.clone(), &holding_id, &req.payment_status).await?;
    Ok(Json(BookingResponse {
        booking_id: booking.booking_id,
        event_id: booking.event_id,
        user_id: booking.user_id,
        seats: booking.seats,
        booking_date: booking.booking_date,
        state: booking.state.as_str().to_string(),
        payment_status: booking.payment_status,
    }))
}

#[derive(Serialize)]
struct CancelResponse {
    message: String,
    booking_id: String,
    event_id: String,
    user_id: String,
    seats_freed: Vec<String>,
    cancelled_at: String,
}

async fn cancel_booking(State(state): State<Arc<AppState>>, Path(booking_id): Path<String>) -> AppResult<Json<CancelResponse>> {
    let outcome = booking::cancel(state.store.clone(), &booking_id).await?;
    Ok(Json(CancelResponse {
        message: "Booking cancelled".to_string(),
        booking_id,
        event_id: outcome.event_id,
        user_id: outcome.user_id,
        seats_freed: outcome.seats_freed,
        cancelled_at: outcome.cancelled_at,
    }))
}
