//! Application state shared across all handlers.

use std::sync::Arc;

use crate::database::EventStore;

/// Application state shared across handlers.
///
/// The event store is built once at startup and injected here, so tests can
/// hand the router any [`EventStore`] implementation.
#[derive(Clone)]
pub struct AppState {
    /// Gateway to the events table
    pub event_store: Arc<dyn EventStore>,
}

impl AppState {
    pub fn new(event_store: Arc<dyn EventStore>) -> Self {
        Self { event_store }
    }
}

impl axum::extract::FromRef<AppState> for Arc<dyn EventStore> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.event_store.clone()
    }
}
