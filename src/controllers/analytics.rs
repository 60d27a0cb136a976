//! analytics.rs
//!
//! Read-only event dashboards: the aggregate summary plus seat- and
//! booking-level views filtered and paginated by query string.

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::domain::{Booking, EventSeat};
use crate::error::AppResult;
use crate::services::analytics::{self, EventAnalytics};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/events/{event_id}/analytics", get(summary))
        .route("/events/{event_id}/analytics/seats", get(seats))
        .route("/events/{event_id}/analytics/bookings", get(bookings))
}

async fn summary(State(state): State<Arc<AppState>>, Path(event_id): Path<String>) -> AppResult<Json<EventAnalytics>> {
    Ok(Json(analytics::event_analytics(state.store.as_ref(), &event_id).await?))
}

fn default_limit() -> usize {
    50
}

#[derive(Deserialize)]
struct SeatFilter {
    seat_type: Option<String>,
    seat_state: Option<String>,
    #[serde(default)]
    offset: usize,
    #[serde(default = "default_limit")]
    limit: usize,
}

async fn seats(
    State(state): State<Arc<AppState>>,
    Path(event_id): Path<String>,
    Query(filter): Query<SeatFilter>,
) -> AppResult<Json<Vec<EventSeat>>> {
    let seats = analytics::seats_filtered(
        state.store.as_ref(),
        &event_id,
        filter.seat_type.as_deref(),
        filter.seat_state.as_deref(),
        filter.offset,
        filter.limit,
    )
    .await?;
    Ok(Json(seats))
}

#[derive(Deserialize)]
struct BookingFilter {
    state: Option<String>,
    #[serde(default)]
    offset: usize,
    #[serde(default = "default_limit")]
    limit: usize,
}

async fn bookings(
    State(state): State<Arc<AppState>>,
    Path(event_id): Path<String>,
    Query(filter): Query<BookingFilter>,
) -> AppResult<Json<Vec<Booking>>> {
    let bookings =
        analytics::bookings_filtered(state.store.as_ref(), &event_id, filter.state.as_deref(), filter.offset, filter.limit).await?;
    Ok(Json(bookings))
}
