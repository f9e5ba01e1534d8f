use axum::http::{Method, Uri};

use crate::error::ApiError;

/// Catch-all for unknown paths and for known paths hit with the wrong method.
pub async fn route_not_found(method: Method, uri: Uri) -> ApiError {
    ApiError::RouteNotFound {
        method,
        path: uri.path().to_string(),
    }
}
