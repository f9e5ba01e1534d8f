use std::any::Any;

use axum::{
    extract::rejection::BytesRejection,
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::{error, warn};

use crate::database::StoreError;
use crate::models::PayloadError;

/// Detail reported when a failure carries no message of its own
pub const UNKNOWN_ERROR: &str = "Unknown error";

/// Body of a failed webhook delivery
#[derive(Debug, Serialize)]
pub struct WebhookErrorResponse {
    pub received: bool,
    pub error: String,
    pub details: String,
}

/// Body returned by the global error trap
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub details: String,
}

#[derive(Debug, Serialize)]
pub struct NotFoundResponse {
    pub error: String,
    pub message: String,
}

/// Failures of the webhook pipeline. All of them answer 500.
///
/// A body that could not be read never reached the webhook logic, so it gets
/// the global error body; every other variant answers with `received: false`.
#[derive(Debug, Error)]
pub enum WebhookError {
    #[error("{}", .0.body_text())]
    BodyRejected(#[from] BytesRejection),

    #[error("Failed to store webhook event")]
    Store(#[from] StoreError),

    #[error("Internal server error")]
    InvalidJson(#[from] serde_json::Error),

    #[error("Internal server error")]
    InvalidPayload(#[from] PayloadError),
}

impl WebhookError {
    /// Message of the underlying failure, or [`UNKNOWN_ERROR`] when it is empty
    pub fn details(&self) -> String {
        let details = match self {
            WebhookError::BodyRejected(e) => e.body_text(),
            WebhookError::Store(e) => e.to_string(),
            WebhookError::InvalidJson(e) => e.to_string(),
            WebhookError::InvalidPayload(e) => e.to_string(),
        };

        if details.trim().is_empty() {
            UNKNOWN_ERROR.to_string()
        } else {
            details
        }
    }
}

impl IntoResponse for WebhookError {
    fn into_response(self) -> Response {
        let details = self.details();
        match &self {
            WebhookError::BodyRejected(_) => return ApiError::Internal(details).into_response(),
            WebhookError::Store(_) => error!(details = %details, "❌ Database error"),
            _ => error!(details = %details, "❌ Webhook processing error"),
        }

        let body = WebhookErrorResponse {
            received: false,
            error: self.to_string(),
            details,
        };

        (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
    }
}

/// Errors answered by the HTTP shell itself rather than by a handler's own contract.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Route {method} {path} not found")]
    RouteNotFound { method: Method, path: String },

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::RouteNotFound { .. } => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn log_error(&self) {
        match self.status_code() {
            status if status.is_server_error() => {
                error!(error = %self, "❌ Unhandled error");
            }
            status if status.is_client_error() => {
                warn!(error = %self, "Client error occurred");
            }
            _ => {}
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        self.log_error();

        let status = self.status_code();
        match self {
            ApiError::RouteNotFound { .. } => {
                let body = NotFoundResponse {
                    error: "Not found".to_string(),
                    message: self.to_string(),
                };
                (status, Json(body)).into_response()
            }
            ApiError::Internal(details) => {
                let body = ErrorResponse {
                    error: "Internal server error".to_string(),
                    details: if details.is_empty() {
                        UNKNOWN_ERROR.to_string()
                    } else {
                        details
                    },
                };
                (status, Json(body)).into_response()
            }
        }
    }
}

/// Turn a handler panic into the global error response.
///
/// Used with `tower_http::catch_panic::CatchPanicLayer::custom`.
pub fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let details = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        UNKNOWN_ERROR.to_string()
    };

    ApiError::Internal(details).into_response()
}
