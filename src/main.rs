use anyhow::Result;
use tracing::error;

use miro_webhook_receiver::{startup, Config};

#[tokio::main]
async fn main() -> Result<()> {
    // Reads .env too. Tracing needs the log format, so it starts before config errors are reported
    let config = Config::from_env();
    let log_format = config.as_ref().map(|c| c.log_format).unwrap_or_default();
    startup::init_tracing(log_format);

    let config = config.inspect_err(|e| error!("❌ Failed to start server: {}", e))?;

    startup::run(config).await
}
