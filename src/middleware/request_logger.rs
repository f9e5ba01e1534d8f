//! Per-request logging
//!
//! Every request gets a fresh id. Handler logs run inside a span carrying
//! that id, and the id is echoed back in the `X-Request-ID` header so a
//! Miro delivery can be matched with its log lines.

use std::time::Instant;

use axum::{
    extract::Request,
    http::{HeaderValue, StatusCode},
    middleware::Next,
    response::Response,
};
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

pub const REQUEST_ID_HEADER: &str = "X-Request-ID";

/// Log each request and its outcome, and tag the response with a request id
pub async fn request_logger_middleware(request: Request, next: Next) -> Response {
    let request_id = Uuid::new_v4().to_string();
    let span = info_span!(
        "request",
        request_id = %request_id,
        method = %request.method(),
        path = %request.uri().path(),
    );

    let start = Instant::now();
    let mut response = async move {
        info!("Incoming request");
        debug!(headers = ?request.headers(), "Request headers");

        let response = next.run(request).await;
        log_outcome(response.status(), start.elapsed().as_millis());
        response
    }
    .instrument(span)
    .await;

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }

    response
}

fn log_outcome(status: StatusCode, duration_ms: u128) {
    if status.is_server_error() {
        error!(status = %status, duration_ms = %duration_ms, "Request failed with server error");
    } else if status.is_client_error() {
        warn!(status = %status, duration_ms = %duration_ms, "Request failed with client error");
    } else if status.is_success() {
        info!(status = %status, duration_ms = %duration_ms, "Request completed successfully");
    } else {
        debug!(status = %status, duration_ms = %duration_ms, "Request completed");
    }
}
