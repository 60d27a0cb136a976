//! holds.rs
//!
//! The hold endpoint: the only way a seat moves out of `available`.

use axum::{
    extract::{Path, State},
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::AppResult;
use crate::services::hold;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/events/{event_id}/hold", post(hold_seats))
}

#[derive(Deserialize)]
struct HoldRequest {
    user_id: String,
    seats: Vec<String>,
}

#[derive(Serialize)]
struct HoldResponse {
    holding_id: String,
    event_id: String,
    seats_held: Vec<String>,
    hold_ttl: i64,
    expires_at: String,
}

async fn hold_seats(
    State(state): State<Arc<AppState>>,
    Path(event_id): Path<String>,
    Json(req): Json<HoldRequest>,
) -> AppResult<Json<HoldResponse>> {
    let outcome = hold::hold(state.store.as_ref(), &event_id, &req.user_id, req.seats).await?;
    Ok(Json(HoldResponse {
        holding_id: outcome.holding_id,
        event_id,
        seats_held: outcome.seats_held,
        hold_ttl: outcome.hold_ttl,
        expires_at: outcome.expires_at,
    }))
}
