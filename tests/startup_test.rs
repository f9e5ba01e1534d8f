//! Startup ordering tests.
//!
//! A gated store holds its probe open until the test releases it, which
//! makes the bind-versus-probe ordering observable.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use miro_webhook_receiver::{
    config::{Config, LogFormat, StartupProbe},
    database::{EventStore, InMemoryEventStore, StoreError},
    models::{NewEventRecord, StoredEvent},
    startup::{bind_and_probe, shutdown_signal, verify_store_connection},
};
use tokio::sync::{Notify, Semaphore};

/// Store whose probe waits for `release` and reports `healthy`.
struct GatedStore {
    release: Semaphore,
    started: Notify,
    finished: Notify,
    healthy: bool,
}

impl GatedStore {
    fn new(healthy: bool) -> Arc<Self> {
        Arc::new(Self {
            release: Semaphore::new(0),
            started: Notify::new(),
            finished: Notify::new(),
            healthy,
        })
    }
}

#[async_trait]
impl EventStore for GatedStore {
    async fn insert_event(&self, _record: &NewEventRecord) -> Result<Vec<StoredEvent>, StoreError> {
        Ok(Vec::new())
    }

    async fn probe(&self) -> bool {
        self.started.notify_one();
        if let Ok(permit) = self.release.acquire().await {
            permit.forget();
        }
        self.finished.notify_one();
        self.healthy
    }
}

fn config(startup_probe: StartupProbe) -> Config {
    Config {
        environment: "test".to_string(),
        port: 0,
        supabase_url: "http://127.0.0.1:9".to_string(),
        supabase_key: "test-key".to_string(),
        events_table: "miro_events".to_string(),
        startup_probe,
        log_format: LogFormat::Pretty,
    }
}

#[tokio::test]
async fn background_probe_binds_before_probing() {
    let store = GatedStore::new(true);

    // The probe is still blocked, yet the listener is already bound
    let listener = bind_and_probe(&config(StartupProbe::Background), store.clone())
        .await
        .expect("listener should bind without waiting for the probe");
    assert_ne!(listener.local_addr().unwrap().port(), 0);

    tokio::time::timeout(Duration::from_secs(5), store.started.notified())
        .await
        .expect("background probe should start");

    store.release.add_permits(1);
    tokio::time::timeout(Duration::from_secs(5), store.finished.notified())
        .await
        .expect("background probe should finish once released");
}

#[tokio::test]
async fn blocking_probe_completes_before_bind() {
    let store = GatedStore::new(false);
    let startup = tokio::spawn({
        let store = store.clone();
        async move { bind_and_probe(&config(StartupProbe::Blocking), store).await }
    });

    tokio::time::timeout(Duration::from_secs(5), store.started.notified())
        .await
        .expect("blocking probe should start");
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!startup.is_finished(), "bind must wait for the probe");

    store.release.add_permits(1);
    let listener = tokio::time::timeout(Duration::from_secs(5), startup)
        .await
        .expect("startup should finish once the probe returns")
        .unwrap()
        .expect("a failed probe must not prevent binding");

    assert_ne!(listener.local_addr().unwrap().port(), 0);
}

#[tokio::test]
async fn verify_store_connection_reports_probe_result() {
    let store = InMemoryEventStore::new();
    assert!(verify_store_connection(&store).await);

    store.set_reachable(false);
    assert!(!verify_store_connection(&store).await);
}

#[tokio::test]
async fn shutdown_waits_for_a_signal() {
    let outcome = tokio::time::timeout(Duration::from_millis(100), shutdown_signal()).await;
    assert!(outcome.is_err(), "shutdown must not begin without Ctrl+C or SIGTERM");
}
