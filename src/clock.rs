//! clock.rs
//!
//! Id generation, ISO-8601 UTC timestamps, and hold expiry arithmetic. Kept
//! as free functions rather than a `Clock` trait — nothing here needs to
//! mock the clock beyond what `chrono` already gives tests (construct a
//! `created_at` in the past).

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

pub const HOLD_TTL_SECONDS: i64 = 180;

pub fn new_event_id() -> String {
    format!("event-{}", short_hex())
}

pub fn new_venue_id() -> String {
    format!("venue-{}", short_hex())
}

pub fn new_user_id() -> String {
    format!("user-{}", short_hex())
}

pub fn new_holding_id() -> String {
    format!("holding-{}", Uuid::new_v4())
}

pub fn new_booking_id() -> String {
    format!("booking-{}", Uuid::new_v4())
}

fn short_hex() -> String {
    Uuid::new_v4().simple().to_string()[..8].to_string()
}

/// `now_iso()` — millisecond-resolution ISO-8601 UTC, lexicographically
/// ordered the same as chronologically (so a Booking's `sk = booking_date`
/// sorts correctly).
pub fn now_iso() -> String {
    Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}

pub fn expiry_iso(ttl_seconds: i64) -> String {
    (Utc::now() + Duration::seconds(ttl_seconds))
        .format("%Y-%m-%dT%H:%M:%S%.3fZ")
        .to_string()
}

/// `is_expired(created_at, ttl) = now > parse(created_at) + ttl`. Parsing
/// tolerates a trailing `Z`; any parse failure is treated as expired
/// (fail-safe: an unparseable hold should never block reclaim).
pub fn is_expired(created_at: &str, ttl_seconds: i64) -> bool {
    match parse_iso(created_at) {
        Some(created) => Utc::now() > created + Duration::seconds(ttl_seconds),
        None => true,
    }
}

fn parse_iso(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_hold_is_not_expired() {
        let created = now_iso();
        assert!(!is_expired(&created, HOLD_TTL_SECONDS));
    }

    #[test]
    fn stale_created_at_is_expired() {
        let created = (Utc::now() - Duration::seconds(HOLD_TTL_SECONDS + 1))
            .format("%Y-%m-%dT%H:%M:%S%.3fZ")
            .to_string();
        assert!(is_expired(&created, HOLD_TTL_SECONDS));
    }

    #[test]
    fn unparseable_created_at_is_expired() {
        assert!(is_expired("not-a-timestamp", HOLD_TTL_SECONDS));
    }

    #[test]
    fn ids_carry_the_right_prefix() {
        assert!(new_event_id().starts_with("event-"));
        assert!(new_venue_id().starts_with("venue-"));
        assert!(new_user_id().starts_with("user-"));
        assert!(new_holding_id().starts_with("holding-"));
        assert!(new_booking_id().starts_with("booking-"));
    }
}
