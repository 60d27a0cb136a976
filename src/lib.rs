pub mod clock;
pub mod config;
pub mod controllers;
pub mod domain;
pub mod error;
pub mod seat_state;
pub mod services;
pub mod store;

use std::sync::Arc;

/// Shared state for the whole application. `store` is a constructor-injected
/// `Arc<dyn Store>`, not a process-wide singleton, so tests can substitute
/// an in-memory store.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn store::Store>,
    pub config: config::Config,
}
