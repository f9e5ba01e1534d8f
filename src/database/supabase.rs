//! Supabase (PostgREST) backed event store.

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::Deserialize;
use tracing::{debug, error, info};

use super::{EventStore, StoreError};
use crate::models::{NewEventRecord, StoredEvent};

/// PostgREST error body, e.g. `{"code":"23502","message":"null value in column ..."}`
#[derive(Debug, Deserialize)]
struct PostgrestError {
    message: Option<String>,
    details: Option<String>,
}

#[derive(Clone)]
pub struct SupabaseEventStore {
    client: Client,
    rest_url: String,
    api_key: String,
    table: String,
}

impl SupabaseEventStore {
    /// Create a store talking to `{base_url}/rest/v1/{table}`.
    ///
    /// The key is sent both as `apikey` and as a bearer token, which is what
    /// Supabase expects from a service-role client.
    pub fn new(
        base_url: &str,
        api_key: impl Into<String>,
        table: impl Into<String>,
    ) -> Result<Self, StoreError> {
        let client = Client::builder().build()?;

        Ok(Self {
            client,
            rest_url: format!("{}/rest/v1", base_url.trim_end_matches('/')),
            api_key: api_key.into(),
            table: table.into(),
        })
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    fn table_url(&self) -> String {
        format!("{}/{}", self.rest_url, self.table)
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
    }

    async fn check(response: Response) -> Result<Response, StoreError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = match serde_json::from_str::<PostgrestError>(&body) {
            Ok(PostgrestError {
                message: Some(message),
                ..
            }) => message,
            Ok(PostgrestError {
                details: Some(details),
                ..
            }) => details,
            _ if !body.trim().is_empty() => body,
            _ => status
                .canonical_reason()
                .unwrap_or("Request failed")
                .to_string(),
        };

        Err(StoreError::Rejected {
            status: status.as_u16(),
            message,
        })
    }
}

#[async_trait]
impl EventStore for SupabaseEventStore {
    async fn insert_event(&self, record: &NewEventRecord) -> Result<Vec<StoredEvent>, StoreError> {
        debug!(table = %self.table, event_type = %record.event_type, "Inserting event");

        let response = self
            .authorized(self.client.post(self.table_url()))
            .header("Prefer", "return=representation")
            .json(record)
            .send()
            .await?;

        let response = Self::check(response).await?;
        let body = response.text().await?;

        // The row was written even when no representation comes back
        if body.trim().is_empty() {
            return Ok(Vec::new());
        }

        serde_json::from_str::<Vec<StoredEvent>>(&body).map_err(|e| StoreError::Decode(e.to_string()))
    }

    async fn probe(&self) -> bool {
        let request = self
            .authorized(self.client.get(self.table_url()))
            .query(&[("select", "id"), ("limit", "1")]);

        let result = match request.send().await {
            Ok(response) => Self::check(response).await.map(|_| ()),
            Err(e) => Err(StoreError::from(e)),
        };

        match result {
            Ok(()) => {
                info!(table = %self.table, "✅ Supabase connection successful");
                true
            }
            Err(e) => {
                error!(table = %self.table, error = %e, "Supabase connection test failed");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::{matchers, Mock, MockServer, ResponseTemplate};

    fn store_for(server: &MockServer) -> SupabaseEventStore {
        SupabaseEventStore::new(&server.uri(), "service-key", "miro_events").unwrap()
    }

    fn record() -> NewEventRecord {
        NewEventRecord::from_payload(json!({"board_id": "b1", "type": "item_created", "x": 1}))
            .unwrap()
    }

    #[tokio::test]
    async fn test_insert_sends_row_and_returns_ids() {
        let server = MockServer::start().await;

        Mock::given(matchers::method("POST"))
            .and(matchers::path("/rest/v1/miro_events"))
            .and(matchers::header("apikey", "service-key"))
            .and(matchers::header("Authorization", "Bearer service-key"))
            .and(matchers::header("Prefer", "return=representation"))
            .and(matchers::body_json(json!({
                "board_id": "b1",
                "event_type": "item_created",
                "payload": {"board_id": "b1", "type": "item_created", "x": 1}
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!([
                {"id": 12, "board_id": "b1", "event_type": "item_created"}
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let rows = store_for(&server).insert_event(&record()).await.unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id.to_string(), "12");
    }

    #[tokio::test]
    async fn test_insert_surfaces_postgrest_message() {
        let server = MockServer::start().await;

        Mock::given(matchers::method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "code": "42P01",
                "message": "relation \"public.miro_events\" does not exist"
            })))
            .mount(&server)
            .await;

        let err = store_for(&server).insert_event(&record()).await.unwrap_err();

        match err {
            StoreError::Rejected { status, message } => {
                assert_eq!(status, 400);
                assert_eq!(message, "relation \"public.miro_events\" does not exist");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_insert_falls_back_to_raw_body() {
        let server = MockServer::start().await;

        Mock::given(matchers::method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("upstream down"))
            .mount(&server)
            .await;

        let err = store_for(&server).insert_event(&record()).await.unwrap_err();
        assert_eq!(err.to_string(), "upstream down");
    }

    #[tokio::test]
    async fn test_insert_rejects_unexpected_body() {
        let server = MockServer::start().await;

        Mock::given(matchers::method("POST"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": 1})))
            .mount(&server)
            .await;

        let err = store_for(&server).insert_event(&record()).await.unwrap_err();
        assert!(matches!(err, StoreError::Decode(_)));
    }

    #[tokio::test]
    async fn test_insert_with_empty_body_returns_no_rows() {
        let server = MockServer::start().await;

        Mock::given(matchers::method("POST"))
            .and(matchers::path("/rest/v1/miro_events"))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&server)
            .await;

        let rows = store_for(&server).insert_event(&record()).await.unwrap();
        assert!(rows.is_empty());
    }

    #[tokio::test]
    async fn test_probe_selects_single_id() {
        let server = MockServer::start().await;

        Mock::given(matchers::method("GET"))
            .and(matchers::path("/rest/v1/miro_events"))
            .and(matchers::query_param("select", "id"))
            .and(matchers::query_param("limit", "1"))
            .and(matchers::header("apikey", "service-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .expect(1)
            .mount(&server)
            .await;

        assert!(store_for(&server).probe().await);
    }

    #[tokio::test]
    async fn test_probe_reports_rejection_as_false() {
        let server = MockServer::start().await;

        Mock::given(matchers::method("GET"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({"message": "Invalid API key"})))
            .mount(&server)
            .await;

        assert!(!store_for(&server).probe().await);
    }

    #[tokio::test]
    async fn test_probe_reports_unreachable_store_as_false() {
        // Nothing listens on port 9 (discard) in the test environment
        let store = SupabaseEventStore::new("http://127.0.0.1:9", "key", "miro_events").unwrap();
        assert!(!store.probe().await);
    }

    #[test]
    fn test_base_url_trailing_slash_is_ignored() {
        let store = SupabaseEventStore::new("https://x.supabase.co/", "key", "events").unwrap();
        assert_eq!(store.table_url(), "https://x.supabase.co/rest/v1/events");
        assert_eq!(store.table(), "events");
    }
}
