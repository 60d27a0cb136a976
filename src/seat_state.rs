//! seat_state.rs
//!
//! The seat state machine: `available -> held -> booked`, with
//! `booked -> available` on cancel, each expressed as the exact
//! conditional-write predicate the transition requires. These are pure
//! `WriteOp` builders — callers (`services::hold`, `services::booking`)
//! assemble them into a `Store::transact_write` batch alongside the Hold/
//! Booking record writes.

use serde_json::Map;

use crate::store::{Predicate, WriteOp};

/// `available -> held`.
pub fn hold_seat(event_id: &str, seat_pos: &str, holding_id: &str, ttl_seconds: i64) -> WriteOp {
    WriteOp::Update {
        pk: event_id.to_string(),
        sk: seat_pos.to_string(),
        set: Map::from_iter([
            ("seat_state".into(), "held".into()),
            ("holding_id".into(), holding_id.into()),
            ("hold_ttl".into(), ttl_seconds.into()),
        ]),
        remove: vec![],
        predicate: Predicate::AttrEq("seat_state".into(), "available".into()),
    }
}

/// `held -> booked`, gated on the caller holding exactly this `holding_id`.
pub fn confirm_seat(event_id: &str, seat_pos: &str, holding_id: &str, booking_id: &str, now_iso: &str) -> WriteOp {
    WriteOp::Update {
        pk: event_id.to_string(),
        sk: seat_pos.to_string(),
        set: Map::from_iter([
            ("seat_state".into(), "booked".into()),
            ("booking_id".into(), booking_id.into()),
            ("updated_at".into(), now_iso.into()),
        ]),
        remove: vec!["holding_id".into(), "hold_ttl".into()],
        predicate: Predicate::AttrEq("seat_state".into(), "held".into())
            .and(Predicate::AttrEq("holding_id".into(), holding_id.into()))
            .and(Predicate::Exists),
    }
}

/// `booked -> available`, gated on the caller owning exactly this
/// `booking_id`.
pub fn cancel_seat(event_id: &str, seat_pos: &str, booking_id: &str, now_iso: &str) -> WriteOp {
    WriteOp::Update {
        pk: event_id.to_string(),
        sk: seat_pos.to_string(),
        set: Map::from_iter([("seat_state".into(), "available".into()), ("updated_at".into(), now_iso.into())]),
        remove: vec!["booking_id".into(), "holding_id".into(), "hold_ttl".into()],
        predicate: Predicate::AttrEq("seat_state".into(), "booked".into())
            .and(Predicate::AttrEq("booking_id".into(), booking_id.into()))
            .and(Predicate::Exists),
    }
}

/// Best-effort reclaim of a seat whose hold has expired: resets a
/// still-`held` seat back to `available` so a fresh hold's
/// `available` predicate can succeed. Run outside the main transaction,
/// before it is assembled; failure here just means the main transaction may
/// itself fail and the caller retries.
pub fn reclaim_stale_hold(event_id: &str, seat_pos: &str, stale_holding_id: &str) -> WriteOp {
    WriteOp::Update {
        pk: event_id.to_string(),
        sk: seat_pos.to_string(),
        set: Map::from_iter([("seat_state".into(), "available".into())]),
        remove: vec!["holding_id".into(), "hold_ttl".into()],
        predicate: Predicate::AttrEq("seat_state".into(), "held".into())
            .and(Predicate::AttrEq("holding_id".into(), stale_holding_id.into())),
    }
}

/// Deletes the Hold record as part of the `held -> booked` transaction:
/// holding ids must not be reusable once consumed.
pub fn delete_hold(event_id: &str, holding_id: &str) -> WriteOp {
    WriteOp::Delete {
        pk: event_id.to_string(),
        sk: holding_id.to_string(),
        predicate: Predicate::AttrEq("holding_id".into(), holding_id.into()),
    }
}
