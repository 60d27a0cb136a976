//! events.rs
//!
//! Event provisioning and the read-only seat listing clients poll while
//! deciding what to hold.

use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

use crate::domain::EventSeat;
use crate::error::AppResult;
use crate::services::provisioner::{self, CreateEventRequest};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/events", post(create_event)).route("/events/{event_id}/seats", get(list_seats))
}

#[derive(Deserialize)]
struct CreateEventRequestBody {
    venue_id: String,
    name: String,
    start_time: String,
    duration_minutes: i64,
    #[serde(default)]
    artists: Vec<String>,
    #[serde(default)]
    tags: Vec<String>,
    description: Option<String>,
    seat_type_prices: HashMap<String, Decimal>,
}

#[derive(Serialize)]
struct EventResponse {
    event_id: String,
    venue_id: String,
    name: String,
    start_time: String,
    duration_minutes: i64,
    artists: Vec<String>,
    tags: Vec<String>,
    description: Option<String>,
    seat_type_prices: HashMap<String, Decimal>,
}

async fn create_event(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateEventRequestBody>,
) -> AppResult<Json<EventResponse>> {
    let event = provisioner::create_event(
        state.store.as_ref(),
        CreateEventRequest {
            venue_id: body.venue_id,
            name: body.name,
            start_time: body.start_time,
            duration_minutes: body.duration_minutes,
            artists: body.artists,
            tags: body.tags,
            description: body.description,
            seat_type_prices: body.seat_type_prices,
        },
    )
    .await?;

    Ok(Json(EventResponse {
        event_id: event.event_id,
        venue_id: event.venue_id,
        name: event.name,
        start_time: event.start_time,
        duration_minutes: event.duration_minutes,
        artists: event.artists,
        tags: event.tags,
        description: event.description,
        seat_type_prices: event.seat_type_prices,
    }))
}

#[derive(Serialize)]
struct SeatResponse {
    seat_pos: String,
    row: String,
    seat_num: String,
    seat_type: String,
    seat_state: String,
    price: Decimal,
    booking_id: Option<String>,
    holding_id: Option<String>,
    hold_ttl: Option<i64>,
}

async fn list_seats(State(state): State<Arc<AppState>>, Path(event_id): Path<String>) -> AppResult<Json<Vec<SeatResponse>>> {
    state
        .store
        .get(&event_id, "EVENT")
        .await?
        .ok_or_else(|| crate::error::AppError::NotFound(format!("Event with ID {event_id} not found")))?;

    let items = state.store.query(&event_id, None).await?;
    let mut seats: Vec<SeatResponse> = items
        .iter()
        .filter(|item| item.sk != "EVENT")
        .filter_map(|item| EventSeat::from_item(item).ok())
        .map(|seat| SeatResponse {
            seat_pos: seat.seat_pos,
            row: seat.row,
            seat_num: seat.seat_num,
            seat_type: seat.seat_type,
            seat_state: seat.seat_state.as_str().to_string(),
            price: seat.price,
            booking_id: seat.booking_id,
            holding_id: seat.holding_id,
            hold_ttl: seat.hold_ttl,
        })
        .collect();
    seats.sort_by(|a, b| a.seat_pos.cmp(&b.seat_pos));
    Ok(Json(seats))
}
