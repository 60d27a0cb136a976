//! venues.rs
//!
//! Minimal venue/venue-seat/user creation. Full venue and user CRUD is out
//! of scope; these are just enough to seed fixtures for event/seat
//! provisioning and for the test suite.

use crate::clock;
use crate::domain::{User, Venue, VenueSeat};
use crate::error::AppResult;
use crate::store::Store;

pub async fn create_venue(
    store: &dyn Store,
    name: String,
    city: String,
    description: Option<String>,
    seat_types: Vec<String>,
) -> AppResult<Venue> {
    let venue = Venue {
        venue_id: clock::new_venue_id(),
        name,
        city,
        description,
        seat_types,
        created_at: clock::now_iso(),
    };
    store.put(venue.to_item()).await?;
    Ok(venue)
}

pub async fn add_venue_seat(
    store: &dyn Store,
    venue_id: &str,
    row: String,
    seat_num: String,
    seat_type: String,
) -> AppResult<VenueSeat> {
    let venue = store
        .get(venue_id, "VENUE")
        .await?
        .ok_or_else(|| crate::error::AppError::NotFound(format!("Venue with ID {venue_id} not found")))?;
    let venue = Venue::from_item(&venue).map_err(|e| crate::error::AppError::Internal(e.to_string()))?;

    if !venue.seat_types.contains(&seat_type) {
        return Err(crate::error::AppError::Validation(format!(
            "seat_type '{seat_type}' is not allowed for venue {venue_id}"
        )));
    }

    let seat = VenueSeat {
        venue_id: venue_id.to_string(),
        seat_pos: VenueSeat::seat_pos(&row, &seat_num),
        row,
        seat_num,
        seat_type,
    };
    store.put(seat.to_item()).await?;
    Ok(seat)
}

pub async fn create_user(store: &dyn Store, email: String, phone: Option<String>) -> AppResult<User> {
    let user = User { user_id: clock::new_user_id(), email, phone, created_at: clock::now_iso() };
    store.put(user.to_item()).await?;
    Ok(user)
}
