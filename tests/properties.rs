//! Property-based checks of the invariants the seat state machine, the
//! services layer, and the in-memory store are expected to uphold
//! regardless of input shape or operation order.

use chrono::{Duration, Utc};
use proptest::collection::vec as pvec;
use proptest::prelude::*;
use rust_decimal::Decimal;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use ticket_system::clock::{expiry_iso, is_expired};
use ticket_system::domain::{Booking, BookingState, EventSeat, Hold, SeatState};
use ticket_system::seat_state::{confirm_seat, hold_seat};
use ticket_system::services::{booking, hold, provisioner, venues};
use ticket_system::store::memory::InMemoryStore;
use ticket_system::store::{Item, Predicate, Store, WriteOp};

proptest! {
    /// A hold created `age` seconds ago is expired exactly when `age > ttl`.
    #[test]
    fn expiry_matches_ttl_boundary(ttl in 1i64..3600, age in 0i64..7200) {
        let created_at = (Utc::now() - Duration::seconds(age)).format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string();
        prop_assert_eq!(is_expired(&created_at, ttl), age > ttl);
    }

    /// `expiry_iso` always lands strictly after now for a positive ttl.
    #[test]
    fn expiry_iso_is_in_the_future(ttl in 1i64..86_400) {
        let expires_at = expiry_iso(ttl);
        prop_assert!(expires_at.as_str() > Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string().as_str());
    }

    /// Malformed timestamps are always treated as expired, never as live.
    #[test]
    fn malformed_timestamp_is_always_expired(garbage in "[a-zA-Z0-9]{0,20}") {
        prop_assert!(is_expired(&garbage, 3600));
    }

    /// `Predicate::And` is commutative for evaluation purposes: order of
    /// conjuncts never changes the verdict.
    #[test]
    fn predicate_and_is_commutative(a in any::<bool>(), b in any::<bool>()) {
        let pa = if a { Predicate::Exists } else { Predicate::NotExists };
        let pb = if b { Predicate::Exists } else { Predicate::NotExists };
        let present = Item::new("pk", "sk");
        let lhs = pa.clone().and(pb.clone()).eval(Some(&present));
        let rhs = pb.and(pa).eval(Some(&present));
        prop_assert_eq!(lhs, rhs);
    }
}

#[tokio::test]
async fn transact_write_is_all_or_nothing_under_interleaving() {
    let store = Arc::new(InMemoryStore::new());
    store
        .put(Item::new("evt-1", "A-1").with("seat_state", "available"))
        .await
        .unwrap();

    let ops = vec![
        hold_seat("evt-1", "A-1", "holding-x", 180),
        WriteOp::Put { item: Item::new("evt-1", "holding-x").with("holding_id", "holding-x"), predicate: Predicate::Exists },
    ];

    let result = store.transact_write(ops).await;
    assert!(result.is_err(), "second op's Exists predicate must fail before the holding record exists");

    let seat = store.get("evt-1", "A-1").await.unwrap().unwrap();
    assert_eq!(seat.get_str("seat_state"), Some("available"), "a failed batch must not partially apply");
}

#[tokio::test]
async fn confirm_seat_requires_matching_holding_id() {
    let store = Arc::new(InMemoryStore::new());
    store
        .put(
            Item::new("evt-1", "A-1")
                .with("seat_state", "held")
                .with("holding_id", "holding-correct"),
        )
        .await
        .unwrap();

    let wrong = confirm_seat("evt-1", "A-1", "holding-wrong", "booking-1", "2026-01-01T00:00:00.000Z");
    assert!(store.transact_write(vec![wrong]).await.is_err());

    let right = confirm_seat("evt-1", "A-1", "holding-correct", "booking-1", "2026-01-01T00:00:00.000Z");
    store.transact_write(vec![right]).await.unwrap();

    let seat = store.get("evt-1", "A-1").await.unwrap().unwrap();
    assert_eq!(seat.get_str("seat_state"), Some("booked"));
}

const SEATS: [&str; 3] = ["A-1", "A-2", "A-3"];
const USER_COUNT: usize = 2;

#[derive(Debug, Clone)]
enum Op {
    Hold { user: usize, seats: Vec<usize> },
    Confirm { target: usize },
    Cancel { target: usize },
    ExpireOldestHold,
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => (0..USER_COUNT, pvec(0..SEATS.len(), 1..=3))
            .prop_map(|(user, seats)| Op::Hold { user, seats }),
        2 => (0usize..5).prop_map(|target| Op::Confirm { target }),
        2 => (0usize..5).prop_map(|target| Op::Cancel { target }),
        1 => Just(Op::ExpireOldestHold),
    ]
}

async fn provision_event() -> (Arc<dyn Store>, String, Vec<String>, Decimal) {
    let store: Arc<dyn Store> = Arc::new(InMemoryStore::new());
    let venue =
        venues::create_venue(store.as_ref(), "Prop Arena".into(), "Almaty".into(), None, vec!["standard".into()])
            .await
            .unwrap();
    for pos in SEATS {
        let (row, num) = pos.split_once('-').unwrap();
        venues::add_venue_seat(store.as_ref(), &venue.venue_id, row.into(), num.into(), "standard".into())
            .await
            .unwrap();
    }

    let mut user_ids = Vec::new();
    for i in 0..USER_COUNT {
        let user = venues::create_user(store.as_ref(), format!("user{i}@example.com"), None).await.unwrap();
        user_ids.push(user.user_id);
    }

    let price = Decimal::new(5000, 2);
    let mut prices = HashMap::new();
    prices.insert("standard".to_string(), price);
    let event = provisioner::create_event(
        store.as_ref(),
        provisioner::CreateEventRequest {
            venue_id: venue.venue_id,
            name: "Prop Concert".into(),
            start_time: "2026-08-01T19:00:00.000Z".into(),
            duration_minutes: 120,
            artists: vec![],
            tags: vec![],
            description: None,
            seat_type_prices: prices,
        },
    )
    .await
    .unwrap();

    (store, event.event_id, user_ids, price)
}

/// Partitions an event's items into seats/holds/bookings and checks
/// invariants 1, 3, and 4 against the state reached so far.
async fn check_invariants(store: &dyn Store, event_id: &str, expected_price: Decimal) {
    let items = store.query(event_id, None).await.unwrap();

    let mut seats: Vec<EventSeat> = Vec::new();
    let mut holds: Vec<Hold> = Vec::new();
    let mut bookings: Vec<Booking> = Vec::new();

    for item in &items {
        if item.sk == "EVENT" {
            continue;
        }
        if let Ok(seat) = EventSeat::from_item(item) {
            seats.push(seat);
        } else if let Ok(h) = Hold::from_item(item) {
            holds.push(h);
        } else if let Ok(b) = Booking::from_item(item) {
            bookings.push(b);
        }
    }

    // Invariant 1: no double booking.
    let mut claimed = HashSet::new();
    for b in bookings.iter().filter(|b| b.state == BookingState::Confirmed) {
        for seat_pos in &b.seats {
            assert!(claimed.insert(seat_pos.clone()), "seat {seat_pos} referenced by two confirmed bookings");
        }
    }

    // Invariant 3: price immutability.
    for seat in &seats {
        assert_eq!(seat.price, expected_price, "seat {} price drifted", seat.seat_pos);
    }

    // Invariant 1/consistency cross-check: a booked seat's booking_id must
    // point at a confirmed booking that actually lists it.
    for seat in &seats {
        if seat.seat_state == SeatState::Booked {
            let booking_id = seat.booking_id.as_ref().expect("booked seat missing booking_id");
            let matching = bookings.iter().find(|b| &b.booking_id == booking_id);
            let matching = matching.unwrap_or_else(|| panic!("no booking record for booked seat {}", seat.seat_pos));
            assert_eq!(matching.state, BookingState::Confirmed);
            assert!(matching.seats.contains(&seat.seat_pos));
        }
    }

    // Invariant 4: hold-record / seat consistency.
    for h in &holds {
        let referenced = seats
            .iter()
            .any(|s| s.seat_state == SeatState::Held && s.holding_id.as_deref() == Some(h.holding_id.as_str()));
        let expired = is_expired(&h.created_at, h.ttl_seconds);
        assert!(referenced || expired, "hold {} is neither referenced by a seat nor expired", h.holding_id);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Drives random interleavings of hold/confirm/cancel (plus forced
    /// expiry) through the real service layer and checks invariants 1, 3, 4,
    /// 5, and 6 after every step.
    #[test]
    fn invariants_hold_under_random_interleavings(ops in pvec(op_strategy(), 1..16)) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let (store, event_id, user_ids, price) = provision_event().await;

            let mut active_holds: Vec<(String, Vec<String>)> = Vec::new();
            let mut confirmed_bookings: Vec<String> = Vec::new();
            let mut cancelled_bookings: HashSet<String> = HashSet::new();

            for op in &ops {
                match op {
                    Op::Hold { user, seats } => {
                        let seat_names: Vec<String> = seats.iter().map(|&i| SEATS[i].to_string()).collect();
                        if let Ok(outcome) = hold::hold(store.as_ref(), &event_id, &user_ids[*user], seat_names).await {
                            if !outcome.holding_id.is_empty() {
                                active_holds.push((outcome.holding_id, outcome.seats_held));
                            }
                        }
                    }
                    Op::Confirm { target } => {
                        if !active_holds.is_empty() {
                            let idx = target % active_holds.len();
                            let (holding_id, _) = active_holds.remove(idx);
                            if let Ok(b) = booking::confirm(store.clone(), &holding_id, "successful").await {
                                confirmed_bookings.push(b.booking_id);
                            }
                        }
                    }
                    Op::Cancel { target } => {
                        if !confirmed_bookings.is_empty() {
                            let idx = target % confirmed_bookings.len();
                            let booking_id = confirmed_bookings[idx].clone();
                            let already_cancelled = cancelled_bookings.contains(&booking_id);
                            let result = booking::cancel(store.clone(), &booking_id).await;
                            if already_cancelled {
                                // Invariant 6: a retried cancel must fail once cancelled.
                                assert!(result.is_err(), "re-cancelling {booking_id} must be rejected");
                            } else if result.is_ok() {
                                cancelled_bookings.insert(booking_id);
                            }
                        }
                    }
                    Op::ExpireOldestHold => {
                        if let Some((holding_id, seats)) = active_holds.first().cloned() {
                            let item = store.get(&event_id, &holding_id).await.unwrap().unwrap();
                            let mut record = Hold::from_item(&item).unwrap();
                            record.created_at = (Utc::now() - Duration::seconds(record.ttl_seconds + 5))
                                .format("%Y-%m-%dT%H:%M:%S%.3fZ")
                                .to_string();
                            store.put(record.to_item()).await.unwrap();

                            // Invariant 5: lazy reclaim succeeds immediately once the ttl has passed.
                            let reclaim = hold::hold(store.as_ref(), &event_id, &user_ids[0], seats).await;
                            assert!(reclaim.is_ok(), "expired hold's seats must be immediately reclaimable");
                            active_holds.retain(|(hid, _)| hid != &holding_id);
                            if let Ok(outcome) = reclaim {
                                active_holds.push((outcome.holding_id, outcome.seats_held));
                            }
                        }
                    }
                }

                check_invariants(store.as_ref(), &event_id, price).await;
            }
        });
    }
}

/// Invariant 2, exercised end to end: confirming with the wrong
/// holding-id never succeeds, confirming with the right one always does.
#[tokio::test]
async fn confirm_enforces_tenancy_end_to_end() {
    let (store, event_id, user_ids, _price) = provision_event().await;
    let outcome = hold::hold(store.as_ref(), &event_id, &user_ids[0], vec!["A-1".to_string()]).await.unwrap();

    let wrong = booking::confirm(store.clone(), "holding-not-mine", "successful").await;
    assert!(wrong.is_err());

    let right = booking::confirm(store.clone(), &outcome.holding_id, "successful").await;
    assert!(right.is_ok());

    let item = store.get(&event_id, "A-1").await.unwrap().unwrap();
    let seat = EventSeat::from_item(&item).unwrap();
    assert_eq!(seat.seat_state, SeatState::Booked);
    assert_eq!(seat.booking_id.as_deref(), Some(right.unwrap().booking_id.as_str()));
}

/// Invariant 6, exercised end to end through `services::booking`: cancel
/// succeeds once, a retry is rejected, and the seat is freed exactly
/// once (never double-freed by the rejected retry).
#[tokio::test]
async fn cancel_is_idempotent_end_to_end() {
    let (store, event_id, user_ids, _price) = provision_event().await;
    let outcome = hold::hold(store.as_ref(), &event_id, &user_ids[0], vec!["A-1".to_string()]).await.unwrap();
    let b = booking::confirm(store.clone(), &outcome.holding_id, "successful").await.unwrap();

    let first = booking::cancel(store.clone(), &b.booking_id).await;
    assert!(first.is_ok());
    assert_eq!(first.unwrap().seats_freed, vec!["A-1".to_string()]);

    let second = booking::cancel(store.clone(), &b.booking_id).await;
    assert!(second.is_err());

    let item = store.get(&event_id, "A-1").await.unwrap().unwrap();
    let seat = EventSeat::from_item(&item).unwrap();
    assert_eq!(seat.seat_state, SeatState::Available);
}
