pub mod fallback;
pub mod health;
pub mod webhooks;

pub use fallback::route_not_found;
pub use health::{health_check, HealthResponse};
pub use webhooks::{receive_miro_webhook, WebhookAck};
