//! Miro webhook ingestion
//!
//! `POST /webhooks/miro` accepts any JSON object, reads `boardId`/`board_id`
//! and `type`/`event_type` for indexing, and stores the whole body as one
//! event row. Delivery authenticity is not checked.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, State},
    response::Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use crate::database::EventStore;
use crate::error::WebhookError;
use crate::models::{EventId, NewEventRecord};

/// Acknowledgement sent back to Miro
#[derive(Debug, Serialize, Deserialize)]
pub struct WebhookAck {
    pub received: bool,
    #[serde(rename = "eventId", skip_serializing_if = "Option::is_none")]
    pub event_id: Option<EventId>,
}

/// Receive a Miro webhook and store it
/// POST /webhooks/miro
pub async fn receive_miro_webhook(
    State(event_store): State<Arc<dyn EventStore>>,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<WebhookAck>, WebhookError> {
    let body = body?;
    let payload = match serde_json::from_slice::<Value>(&body) {
        Ok(payload) => {
            info!(
                "📥 Received Miro webhook: {}",
                serde_json::to_string_pretty(&payload).unwrap_or_else(|_| payload.to_string())
            );
            payload
        }
        Err(e) => {
            info!(
                body = %String::from_utf8_lossy(&body),
                "📥 Received Miro webhook with unparsable body"
            );
            return Err(e.into());
        }
    };

    let record = NewEventRecord::from_payload(payload)?;
    let rows = event_store.insert_event(&record).await?;
    let event_id = rows.into_iter().next().map(|row| row.id);

    match &event_id {
        Some(id) => info!(event_id = %id, event_type = %record.event_type, "✅ Event stored successfully"),
        None => info!(event_type = %record.event_type, "✅ Event stored successfully (no row returned)"),
    }

    Ok(Json(WebhookAck {
        received: true,
        event_id,
    }))
}
