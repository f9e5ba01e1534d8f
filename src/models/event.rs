//! Event record models
//!
//! A Miro webhook call is normalized into a [`NewEventRecord`] before it is
//! handed to the store. The store answers with [`StoredEvent`] rows.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Event type stored when the payload carries neither `type` nor `event_type`
pub const UNKNOWN_EVENT_TYPE: &str = "unknown";

/// Payload fields consulted for the board identifier, in priority order
const BOARD_ID_FIELDS: [&str; 2] = ["boardId", "board_id"];

/// Payload fields consulted for the event type, in priority order
const EVENT_TYPE_FIELDS: [&str; 2] = ["type", "event_type"];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PayloadError {
    #[error("Webhook payload must be a JSON object, got {0}")]
    NotAnObject(&'static str),
}

/// Row written to the events table for one webhook call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewEventRecord {
    pub board_id: Option<String>,
    pub event_type: String,
    /// The request body exactly as received
    pub payload: Value,
}

impl NewEventRecord {
    /// Build a record from a parsed webhook body.
    ///
    /// `board_id` and `event_type` are read from the payload for indexing;
    /// the payload itself is kept whole.
    pub fn from_payload(payload: Value) -> Result<Self, PayloadError> {
        let fields = payload
            .as_object()
            .ok_or_else(|| PayloadError::NotAnObject(json_kind(&payload)))?;

        let board_id = first_present(fields, &BOARD_ID_FIELDS);
        let event_type = first_present(fields, &EVENT_TYPE_FIELDS)
            .unwrap_or_else(|| UNKNOWN_EVENT_TYPE.to_string());

        Ok(Self {
            board_id,
            event_type,
            payload,
        })
    }
}

/// Identifier the store assigned to an inserted row.
///
/// Tables keyed by `bigserial` hand back numbers, `uuid` keys hand back
/// strings; both are echoed to the caller untouched.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EventId {
    Int(i64),
    Text(String),
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventId::Int(id) => write!(f, "{}", id),
            EventId::Text(id) => write!(f, "{}", id),
        }
    }
}

/// A row returned by the store after insert. Columns other than `id` are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredEvent {
    pub id: EventId,
}

/// First candidate field holding a truthy value, rendered as text.
///
/// `null`, `false`, `0` and `""` count as absent so the next candidate is
/// tried, mirroring how Miro integrations have always read these fields.
fn first_present(fields: &Map<String, Value>, candidates: &[&str]) -> Option<String> {
    candidates
        .iter()
        .filter_map(|name| fields.get(*name))
        .find(|value| is_truthy(value))
        .map(render)
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0 && !f.is_nan()).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn render(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
