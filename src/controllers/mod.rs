//! mod.rs
//!
//! Root routing module for the API.

pub mod analytics;
pub mod bookings;
pub mod events;
pub mod holds;
pub mod venues;

use axum::Router;
use std::sync::Arc;

use crate::AppState;

/// Assembles the application's router. Tenancy (holding_id/booking_id
/// ownership) is enforced inside the service layer, not as middleware, since
/// there is no user session here beyond the opaque ids callers already hold.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .merge(venues::routes())
        .merge(events::routes())
        .merge(holds::routes())
        .merge(bookings::routes())
        .merge(analytics::routes())
}
