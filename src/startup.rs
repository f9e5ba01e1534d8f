//! Application startup and initialization logic

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::app_state::AppState;
use crate::config::{Config, LogFormat, StartupProbe};
use crate::database::{EventStore, SupabaseEventStore};
use crate::router::{self, HEALTH_PATH, MIRO_WEBHOOK_PATH};

const DEFAULT_LOG_FILTER: &str = "miro_webhook_receiver=debug,tower_http=debug";

/// Install the global tracing subscriber. `RUST_LOG` overrides the default filter.
pub fn init_tracing(format: LogFormat) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_LOG_FILTER.into());

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let result = match format {
        LogFormat::Pretty => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };

    if let Err(e) = result {
        // Only happens when a subscriber is already installed, e.g. in tests
        eprintln!("Tracing subscriber already initialized: {}", e);
    }
}

/// Create the event store and the AppState around it.
pub fn initialize_app(config: &Config) -> Result<AppState> {
    let event_store = SupabaseEventStore::new(
        &config.supabase_url,
        config.supabase_key.clone(),
        config.events_table.clone(),
    )
    .map_err(|e| anyhow::anyhow!("Failed to create Supabase client: {}", e))?;
    info!(
        "✅ Supabase client initialized (table: {})",
        event_store.table()
    );

    Ok(AppState::new(Arc::new(event_store)))
}

/// Run the server until a shutdown signal arrives.
pub async fn run(config: Config) -> Result<()> {
    let app_state = initialize_app(&config)?;
    let listener = bind_and_probe(&config, app_state.event_store.clone()).await?;
    let app = router::build_router(app_state);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

/// Bind the listener and check the store, in the order `config.startup_probe` asks for.
///
/// The probe outcome is only logged; the listener is returned either way.
pub async fn bind_and_probe(
    config: &Config,
    event_store: Arc<dyn EventStore>,
) -> Result<TcpListener> {
    match config.startup_probe {
        StartupProbe::Blocking => {
            verify_store_connection(event_store.as_ref()).await;
            let listener = bind(config.port).await?;
            log_banner(config, listener.local_addr()?);
            Ok(listener)
        }
        StartupProbe::Background => {
            let listener = bind(config.port).await?;
            log_banner(config, listener.local_addr()?);
            tokio::spawn(async move {
                verify_store_connection(event_store.as_ref()).await;
            });
            Ok(listener)
        }
    }
}

/// Probe the store and log the outcome. Never fails.
pub async fn verify_store_connection(event_store: &dyn EventStore) -> bool {
    info!("🔍 Testing Supabase connection...");
    let connected = event_store.probe().await;

    if connected {
        info!("✅ Supabase connection verified");
    } else {
        warn!("⚠️  Warning: Could not establish Supabase connection");
        warn!("⚠️  Database operations may fail");
    }

    connected
}

async fn bind(port: u16) -> Result<TcpListener> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    TcpListener::bind(addr)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind {}: {}", addr, e))
}

fn log_banner(config: &Config, addr: SocketAddr) {
    info!("🚀 Miro Webhook Receiver started successfully!");
    info!(
        "📡 Server listening on port {} on all interfaces (0.0.0.0)",
        addr.port()
    );
    info!("🔧 Server address: {}", addr);
    info!("🌍 Environment: {}", config.environment);
    info!("🏥 Health check: http://localhost:{}{}", addr.port(), HEALTH_PATH);
    info!(
        "📨 Webhook endpoint: http://localhost:{}{}",
        addr.port(),
        MIRO_WEBHOOK_PATH
    );
    info!("Ready to receive Miro webhooks...");
}

/// Resolve once Ctrl+C or SIGTERM arrives.
///
/// In-flight deliveries finish before `axum::serve` returns. A signal whose
/// handler cannot be installed is logged and then never fires.
pub async fn shutdown_signal() {
    use tokio::signal;

    let interrupt = async {
        match signal::ctrl_c().await {
            Ok(()) => "Ctrl+C",
            Err(e) => {
                error!("Could not listen for Ctrl+C: {}", e);
                std::future::pending().await
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
                "SIGTERM"
            }
            Err(e) => {
                error!("Could not listen for SIGTERM: {}", e);
                std::future::pending().await
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<&str>();

    let received = tokio::select! {
        name = interrupt => name,
        name = terminate => name,
    };

    info!("🛑 {} received, draining in-flight webhooks before shutdown", received);
}
