// Data models - webhook event records

pub mod event;

pub use event::{EventId, NewEventRecord, PayloadError, StoredEvent, UNKNOWN_EVENT_TYPE};
