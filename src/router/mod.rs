//! Router configuration
//!
//! Two routes, a 404 fallback for everything else, and the shared layer stack.

use axum::{
    extract::DefaultBodyLimit,
    middleware::from_fn,
    routing::{get, post, MethodRouter},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{catch_panic::CatchPanicLayer, trace::TraceLayer};

use crate::app_state::AppState;
use crate::error::handle_panic;
use crate::handlers::{health_check, receive_miro_webhook, route_not_found};
use crate::middleware::request_logger_middleware;

pub const HEALTH_PATH: &str = "/health";
pub const MIRO_WEBHOOK_PATH: &str = "/webhooks/miro";

/// Largest webhook body buffered before the request is answered with a 500
pub const MAX_WEBHOOK_BODY_BYTES: usize = 2 * 1024 * 1024;

/// Build the application router.
pub fn build_router(app_state: AppState) -> Router {
    with_layers(routes()).with_state(app_state)
}

/// Route table without layers or state.
///
/// Known paths hit with another method answer 404 like unknown paths do.
/// Both paths also answer with a trailing slash.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route(HEALTH_PATH, health_route())
        .route(&format!("{}/", HEALTH_PATH), health_route())
        .route(MIRO_WEBHOOK_PATH, webhook_route())
        .route(&format!("{}/", MIRO_WEBHOOK_PATH), webhook_route())
        .fallback(route_not_found)
}

fn health_route() -> MethodRouter<AppState> {
    get(health_check).fallback(route_not_found)
}

fn webhook_route() -> MethodRouter<AppState> {
    post(receive_miro_webhook)
        .fallback(route_not_found)
        .layer(DefaultBodyLimit::max(MAX_WEBHOOK_BODY_BYTES))
}

/// Wrap a router in the logging and error-trap layers.
///
/// Panics are caught innermost so the request logger still records the 500.
pub fn with_layers<S>(router: Router<S>) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    router.layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(from_fn(request_logger_middleware))
            .layer(CatchPanicLayer::custom(handle_panic)),
    )
}
