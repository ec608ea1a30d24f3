//! docforge service binary
//!
//! Wires configuration, telemetry, the artifact store, the retention
//! sweeper, and the HTTP router together, then serves until interrupted.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;

use docforge_artifact::{ArtifactStore, RetentionSweeper};
use docforge_core::DocforgeConfig;
use docforge_server::{AppState, create_router};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    docforge_telemetry::init_telemetry();

    let config = DocforgeConfig::load()?;

    let store = Arc::new(ArtifactStore::new(config.storage.root.clone()));
    store
        .ensure_directories()
        .await
        .context("creating artifact directories")?;

    let sweeper = RetentionSweeper::new(
        store.clone(),
        Duration::from_secs(config.storage.retention_secs),
    )
    .start();

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let state = AppState::new(config, store)?;
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    tracing::info!(%addr, "docforge listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    sweeper.shutdown().await;
    tracing::info!("docforge stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::warn!(%error, "failed to listen for shutdown signal");
    }
}
