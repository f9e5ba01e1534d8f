//! In-process event store used by tests.

use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;

use super::{EventStore, StoreError};
use crate::models::{EventId, NewEventRecord, StoredEvent};

#[derive(Default)]
struct Inner {
    next_id: i64,
    rows: Vec<(EventId, NewEventRecord)>,
    failure: Option<String>,
    reachable: bool,
}

/// Keeps inserted rows in memory and hands out sequential integer ids.
///
/// Can be told to fail inserts with a given message or to fail probes, so
/// the error paths of the webhook pipeline are observable.
#[derive(Clone)]
pub struct InMemoryEventStore {
    inner: Arc<Mutex<Inner>>,
}

impl Default for InMemoryEventStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryEventStore {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                next_id: 1,
                reachable: true,
                ..Inner::default()
            })),
        }
    }

    /// Make every following insert fail with `message`.
    pub fn fail_inserts(&self, message: impl Into<String>) {
        self.lock().failure = Some(message.into());
    }

    pub fn set_reachable(&self, reachable: bool) {
        self.lock().reachable = reachable;
    }

    /// Snapshot of all stored rows, in insertion order.
    pub fn rows(&self) -> Vec<(EventId, NewEventRecord)> {
        self.lock().rows.clone()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // A panic while holding the lock leaves the data consistent: every
        // mutation is a single assignment or push.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl EventStore for InMemoryEventStore {
    async fn insert_event(&self, record: &NewEventRecord) -> Result<Vec<StoredEvent>, StoreError> {
        let mut inner = self.lock();
        if let Some(message) = &inner.failure {
            return Err(StoreError::Rejected {
                status: 500,
                message: message.clone(),
            });
        }

        let id = EventId::Int(inner.next_id);
        inner.next_id += 1;
        inner.rows.push((id.clone(), record.clone()));

        Ok(vec![StoredEvent { id }])
    }

    async fn probe(&self) -> bool {
        let reachable = self.lock().reachable;
        if !reachable {
            tracing::error!("In-memory store marked unreachable");
        }
        reachable
    }
}
