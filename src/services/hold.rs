//! hold.rs
//!
//! Creates a hold atomically across N seats, enforces deduplication and
//! expiry-reclaim semantics, and bumps the event's `hold_attempts` counter.

use serde_json::Map;
use std::sync::Arc;

use crate::clock::{self, HOLD_TTL_SECONDS};
use crate::domain::{Event, EventSeat, Hold, SeatState};
use crate::error::{AppError, AppResult};
use crate::seat_state;
use crate::store::{Predicate, Store, StoreError, WriteOp};

pub struct HoldOutcome {
    pub holding_id: String,
    pub seats_held: Vec<String>,
    pub hold_ttl: i64,
    pub expires_at: String,
}

fn dedup_preserve_order(seats: &[String]) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::new();
    for s in seats {
        if seen.insert(s.clone()) {
            out.push(s.clone());
        }
    }
    out
}

pub async fn hold(store: &dyn Store, event_id: &str, user_id: &str, seats: Vec<String>) -> AppResult<HoldOutcome> {
    let event_item = store
        .get(event_id, "EVENT")
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Event with ID {event_id} not found")))?;
    let _event = Event::from_item(&event_item).map_err(|e| AppError::Internal(e.to_string()))?;

    store
        .get(user_id, "USER")
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User with ID {user_id} not found")))?;

    let unique_seats = dedup_preserve_order(&seats);

    if unique_seats.is_empty() {
        return Ok(HoldOutcome {
            holding_id: String::new(),
            seats_held: vec![],
            hold_ttl: HOLD_TTL_SECONDS,
            expires_at: clock::expiry_iso(HOLD_TTL_SECONDS),
        });
    }

    let event_seats = store.query(event_id, None).await?;
    let mut seat_map = std::collections::HashMap::new();
    for item in &event_seats {
        if item.sk == "EVENT" {
            continue;
        }
        if let Ok(seat) = EventSeat::from_item(item) {
            seat_map.insert(seat.seat_pos.clone(), seat);
        }
    }

    let mut blocking = Vec::new();
    let mut stale_reclaims = Vec::new();

    for seat_pos in &unique_seats {
        let Some(seat) = seat_map.get(seat_pos) else {
            return Err(AppError::Validation(format!("Seat {seat_pos} does not exist for this event")));
        };

        match seat.seat_state {
            SeatState::Available => {}
            SeatState::Booked => blocking.push(seat_pos.clone()),
            SeatState::Held => match &seat.holding_id {
                // Liveness is determined by the Hold record's `created_at`,
                // not anything on the seat itself — resolved below.
                Some(holding_id) => stale_reclaims.push((seat_pos.clone(), holding_id.clone())),
                None => blocking.push(seat_pos.clone()),
            },
        }
    }

    if !blocking.is_empty() {
        return Err(AppError::Conflict(format!("Seats are not available: {blocking:?}")));
    }

    // Resolve staleness precisely against the Hold record (the seat alone
    // doesn't carry `created_at`): only seats whose holding has actually
    // expired get reclaimed; the rest still block the request.
    let mut truly_stale = Vec::new();
    let mut still_blocking = Vec::new();
    for (seat_pos, holding_id) in stale_reclaims {
        match store.get(event_id, &holding_id).await? {
            Some(hold_item) => {
                if let Ok(hold_record) = Hold::from_item(&hold_item) {
                    if clock::is_expired(&hold_record.created_at, hold_record.ttl_seconds) {
                        truly_stale.push((seat_pos, holding_id));
                    } else {
                        still_blocking.push(seat_pos);
                    }
                } else {
                    truly_stale.push((seat_pos, holding_id));
                }
            }
            None => truly_stale.push((seat_pos, holding_id)),
        }
    }

    if !still_blocking.is_empty() {
        return Err(AppError::Conflict(format!("Seats are not available: {still_blocking:?}")));
    }

    // Best-effort pre-step reclaim, outside the main transaction: its
    // failure just means the main transaction below may itself fail and the
    // caller retries.
    for (seat_pos, stale_holding_id) in &truly_stale {
        let op = seat_state::reclaim_stale_hold(event_id, seat_pos, stale_holding_id);
        if let WriteOp::Update { pk, sk, set, remove, predicate } = op {
            if let Err(e) = store.update_conditional(&pk, &sk, set, remove, predicate).await {
                tracing::warn!(seat_pos = %sk, error = %e, "best-effort stale hold reclaim failed");
            }
        }
    }

    let holding_id = clock::new_holding_id();
    let ttl = HOLD_TTL_SECONDS;
    let created_at = clock::now_iso();
    let expires_at = clock::expiry_iso(ttl);

    let hold_record = Hold {
        event_id: event_id.to_string(),
        holding_id: holding_id.clone(),
        user_id: user_id.to_string(),
        seats: unique_seats.clone(),
        created_at,
        expires_at: expires_at.clone(),
        ttl_seconds: ttl,
    };

    let mut ops = vec![WriteOp::Put { item: hold_record.to_item(), predicate: Predicate::None }];
    for seat_pos in &unique_seats {
        ops.push(seat_state::hold_seat(event_id, seat_pos, &holding_id, ttl));
    }

    match store.transact_write(ops).await {
        Ok(()) => {}
        Err(StoreError::TransactionCancelled(_)) | Err(StoreError::PredicateFailed(_, _)) => {
            return Err(AppError::Conflict("seats became unavailable; retry".to_string()));
        }
        Err(e) => return Err(e.into()),
    }

    bump_hold_attempts(store, event_id).await;

    Ok(HoldOutcome { holding_id, seats_held: unique_seats, hold_ttl: ttl, expires_at })
}

/// Non-blocking counter bump: its failure must not fail the hold itself.
/// Read-increment-write since the store contract has no atomic counter op;
/// a lost update under concurrent holds only skews `failed_holds`, never
/// correctness.
async fn bump_hold_attempts(store: &dyn Store, event_id: &str) {
    if let Err(e) = increment_counter(store, event_id, "hold_attempts", 1).await {
        tracing::warn!(event_id, error = %e, "failed to bump hold_attempts");
    }
}

pub async fn increment_counter(store: &dyn Store, event_id: &str, field: &str, delta: i64) -> AppResult<()> {
    let current = store
        .get(event_id, "EVENT")
        .await?
        .and_then(|item| item.get(field).and_then(|v| v.as_i64()))
        .unwrap_or(0);
    let set = Map::from_iter([(field.to_string(), (current + delta).into())]);
    store.update_conditional(event_id, "EVENT", set, vec![], Predicate::Exists).await?;
    Ok(())
}

pub fn spawn_increment(store: Arc<dyn Store>, event_id: String, field: &'static str, delta: i64) {
    tokio::spawn(async move {
        if let Err(e) = increment_counter(store.as_ref(), &event_id, field, delta).await {
            tracing::warn!(event_id, field, error = %e, "non-blocking analytics update failed");
        }
    });
}
