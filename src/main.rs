// Main entry point - Dependency injection and server setup
mod domain;
mod application;
mod infrastructure;
mod presentation;

use std::{net::SocketAddr, sync::Arc};
use anyhow::Context;
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

use crate::application::bootstrap::BootstrapLoader;
use crate::application::dispatcher::CommandDispatcher;
use crate::application::projector::DashboardProjector;
use crate::application::supervisor::StreamSupervisor;
use crate::domain::threshold::ThresholdTable;
use crate::infrastructure::config::load_dashboard_config;
use crate::infrastructure::http_device_api::HttpDeviceApi;
use crate::infrastructure::memory_dashboard::MemoryDashboard;
use crate::infrastructure::websocket_stream::WebSocketConnector;
use crate::presentation::app_state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load configuration
    let config = load_dashboard_config().context("Failed to load dashboard configuration")?;
    let thresholds = ThresholdTable::from_overrides(&config.thresholds)
        .context("Invalid threshold overrides")?;
    let display_offset = config.display_offset()?;

    // Create adapters (infrastructure layer)
    let api = Arc::new(HttpDeviceApi::new(
        &config.api.host,
        config.api.port,
        config.api_timeout(),
    )?);
    let dashboard = Arc::new(MemoryDashboard::new(config.series.capacity));

    // Create services (application layer)
    let dispatcher = CommandDispatcher::new(api.clone(), dashboard.clone());
    let state = Arc::new(AppState {
        dashboard: dashboard.clone(),
        dispatcher,
        control_device: config.api.device.clone(),
    });

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("shutdown requested");
        }
        let _ = shutdown_tx.send(true);
    });

    // Start server (presentation layer)
    let addr: SocketAddr = config
        .http
        .listen
        .parse()
        .with_context(|| format!("Invalid listen address {}", config.http.listen))?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    tracing::info!(%addr, "starting power dashboard");

    let server_shutdown = shutdown_signal(shutdown_rx.clone());
    let server = tokio::spawn(async move {
        axum::serve(listener, presentation::router(state))
            .with_graceful_shutdown(server_shutdown)
            .await
    });

    // Prime charts, then follow the live stream
    let loader = BootstrapLoader::new(
        api.clone(),
        dashboard.clone(),
        config.retry_policy(),
        display_offset,
        config.api.device.clone(),
    );
    match loader.bootstrap(config.history.lookback_minutes).await {
        Ok(report) => {
            let projector = DashboardProjector::new(dashboard.clone(), thresholds, display_offset);
            let connector = Arc::new(WebSocketConnector::new(config.stream_url()));
            let supervisor = StreamSupervisor::new(
                connector,
                projector,
                dashboard.clone(),
                config.backoff(),
                &report,
            );
            let stats = supervisor.run(shutdown_signal(shutdown_rx)).await;
            tracing::info!(
                connections = stats.connections,
                frames_projected = stats.frames_projected,
                "stream supervisor finished"
            );
        }
        // The failure stays visible on the dashboard-status slot.
        Err(e) => tracing::error!(error = %e, "live updates disabled"),
    }

    server.await.context("HTTP server task panicked")??;
    Ok(())
}

async fn shutdown_signal(mut rx: watch::Receiver<bool>) {
    let _ = rx.wait_for(|stop| *stop).await;
}
