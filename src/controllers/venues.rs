//! venues.rs
//!
//! Minimal fixture-creation endpoints: venue, venue-seat, and user creation.
//! Intentionally thin — no update/delete, no search, no pagination.

use axum::{extract::State, routing::post, Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::AppResult;
use crate::services::venues;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/venues", post(create_venue))
        .route("/venues/{venue_id}/seats", post(add_venue_seat))
        .route("/users", post(create_user))
}

#[derive(Deserialize)]
struct CreateVenueRequest {
    name: String,
    city: String,
    description: Option<String>,
    seat_types: Vec<String>,
}

#[derive(Serialize)]
struct VenueResponse {
    venue_id: String,
    name: String,
    city: String,
    description: Option<String>,
    seat_types: Vec<String>,
    created_at: String,
}

async fn create_venue(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateVenueRequest>,
) -> AppResult<Json<VenueResponse>> {
    let venue = venues::create_venue(state.store.as_ref(), req.name, req.city, req.description, req.seat_types).await?;
    Ok(Json(VenueResponse {
        venue_id: venue.venue_id,
        name: venue.name,
        city: venue.city,
        description: venue.description,
        seat_types: venue.seat_types,
        created_at: venue.created_at,
    }))
}

#[derive(Deserialize)]
struct AddVenueSeatRequest {
    row: String,
    seat_num: String,
    seat_type: String,
}

#[derive(Serialize)]
struct VenueSeatResponse {
    venue_id: String,
    seat_pos: String,
    row: String,
    seat_num: String,
    seat_type: String,
}

async fn add_venue_seat(
    State(state): State<Arc<AppState>>,
    axum::extract::Path(venue_id): axum::extract::Path<String>,
    Json(req): Json<AddVenueSeatRequest>,
) -> AppResult<Json<VenueSeatResponse>> {
    let seat = venues::add_venue_seat(state.store.as_ref(), &venue_id, req.row, req.seat_num, req.seat_type).await?;
    Ok(Json(VenueSeatResponse {
        venue_id: seat.venue_id,
        seat_pos: seat.seat_pos,
        row: seat.row,
        seat_num: seat.seat_num,
        seat_type: seat.seat_type,
    }))
}

#[derive(Deserialize)]
struct CreateUserRequest {
    email: String,
    phone: Option<String>,
}

#[derive(Serialize)]
struct UserResponse {
    user_id: String,
    email: String,
    phone: Option<String>,
    created_at: String,
}

async fn create_user(State(state): State<Arc<AppState>>, Json(req): Json<CreateUserRequest>) -> AppResult<Json<UserResponse>> {
    let user = venues::create_user(state.store.as_ref(), req.email, req.phone).await?;
    Ok(Json(UserResponse { user_id: user.user_id, email: user.email, phone: user.phone, created_at: user.created_at }))
}
