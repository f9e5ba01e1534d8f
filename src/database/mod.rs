//! Event storage gateway.
//!
//! Handlers only see the [`EventStore`] trait. Production wires in
//! [`SupabaseEventStore`]; tests use [`InMemoryEventStore`].

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{NewEventRecord, StoredEvent};

pub mod memory;
pub mod supabase;

pub use memory::InMemoryEventStore;
pub use supabase::SupabaseEventStore;

/// Default name of the table holding webhook events
pub const DEFAULT_EVENTS_TABLE: &str = "miro_events";

#[derive(Debug, Error)]
pub enum StoreError {
    /// The store answered but refused the operation
    #[error("{message}")]
    Rejected { status: u16, message: String },

    #[error("{0}")]
    Transport(#[from] reqwest::Error),

    #[error("Unexpected response from store: {0}")]
    Decode(String),
}

#[async_trait]
pub trait EventStore: Send + Sync {
    /// Insert one event and return the inserted rows.
    async fn insert_event(&self, record: &NewEventRecord) -> Result<Vec<StoredEvent>, StoreError>;

    /// Cheap read against the events table to confirm the store is reachable.
    ///
    /// Never fails: problems are logged and reported as `false`.
    async fn probe(&self) -> bool;
}
