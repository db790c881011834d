//! # lightsyncd — light synchronization daemon
//!
//! Composition root that wires all adapters together and starts the server.
//!
//! ## Responsibilities
//! - Parse configuration (env vars, config file)
//! - Initialize the `SQLite` connection pool and run migrations
//! - Load the device list before any bus traffic is processed
//! - Start the engine worker and hand its handle to the MQTT bus
//! - Build the axum router over the same handle, bind and serve
//! - Handle graceful shutdown (SIGTERM/SIGINT)
//!
//! ## Dependency rule
//! This is the **only** crate that depends on all other crates.
//! It is the wiring layer — no domain logic belongs here.

mod config;

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use lightsync_adapter_http_axum::router;
use lightsync_adapter_http_axum::state::AppState;
use lightsync_adapter_mqtt::MqttBus;
use lightsync_adapter_storage_sqlite_sqlx::{SqliteDeviceStore, connect};
use lightsync_app::engine::SyncEngine;
use lightsync_app::ports::MessageBus;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = config::Config::load()?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&config.logging.filter))
        .init();

    // Database
    let pool = connect(config.database_url()).await?;
    let store = SqliteDeviceStore::new(pool);

    // Engine
    let bus = Arc::new(MqttBus::new(&config.mqtt));
    let engine = SyncEngine::new(store, Arc::clone(&bus), config.engine_config()?);
    let devices = engine.reload().await?;
    tracing::info!(count = devices.len(), "device list loaded");

    let (handle, worker) = engine.spawn();

    // Bus
    bus.attach(handle.clone())?;
    bus.connect().await?;

    // HTTP
    let app = router::build(AppState::new(handle));
    let bind_addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!(%bind_addr, "lightsyncd listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Err(err) = bus.disconnect().await {
        tracing::warn!(error = %err, "failed to disconnect from MQTT broker");
    }
    // The bus keeps a handle as its sink, so the worker never drains on its own.
    worker.abort();
    tracing::info!("lightsyncd stopped");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to listen for Ctrl+C");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    tracing::info!("shutdown signal received");
}
