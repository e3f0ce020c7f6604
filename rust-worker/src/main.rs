//! BulkMsg Server - accepts bulk messaging jobs and delivers them in the background.
//!
//! This binary:
//! - Receives jobs on `POST /send-message`
//! - Verifies the API key and validates the job
//! - Queues the job and answers immediately
//! - Delivers each job recipient by recipient with a randomized pacing delay

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::Client;
use tokio::{net::TcpListener, signal};
use tracing::{info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use bulkmsg::web::router;
use bulkmsg::{
    AppState, Config, DispatchQueue, Dispatcher, GatewayTransport, NoopTransport, Pacing,
    Resolver, Transport,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize structured JSON logging
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().json().flatten_event(true))
        .init();

    info!("server_starting");

    // Load configuration
    let config = Config::from_env();
    info!(
        port = config.port,
        api_key_configured = config.api_key.is_some(),
        pacing_min_ms = config.pacing_delay_ms.0,
        pacing_max_ms = config.pacing_delay_ms.1,
        transport_configured = config.transport_url.is_some(),
        upload_dir = %config.upload_dir.display(),
        queue_capacity = config.dispatch_queue_capacity,
        "config_loaded"
    );

    if config.api_key.is_none() {
        warn!("api_key_missing_all_submissions_rejected");
    }

    let timeout = Duration::from_millis(config.request_timeout_ms);

    // Transport session
    let transport: Arc<dyn Transport> = match &config.transport_url {
        Some(url) => Arc::new(
            GatewayTransport::new(url.clone(), config.transport_token.clone(), timeout)
                .context("Failed to create transport client")?,
        ),
        None => {
            warn!("transport_url_missing_using_noop");
            Arc::new(NoopTransport)
        }
    };

    match transport.health_check().await {
        Ok(()) => info!(transport = transport.name(), "transport_connected"),
        Err(e) => warn!(transport = transport.name(), error = %e, "transport_unavailable"),
    }

    // Shared HTTP client for attachment downloads
    let client = Client::builder()
        .timeout(timeout)
        .build()
        .context("Failed to create HTTP client")?;

    let dispatcher = Dispatcher::new(
        transport.clone(),
        Resolver::new(client, config.drive_download_url.clone()),
        Pacing::from_millis(config.pacing_delay_ms),
        config.address_suffix.clone(),
    );
    let (queue, worker) = DispatchQueue::start(Arc::new(dispatcher), config.dispatch_queue_capacity);
    info!("dispatch_queue_started");

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let app = router(AppState::new(config, queue, transport));

    // Bind to address
    let listener = TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    info!(address = %addr, "server_listening");

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    // Jobs are not persisted; anything still queued is dropped here.
    worker.shutdown().await;

    info!("server_shutdown_complete");

    Ok(())
}

/// Create a future that completes when a shutdown signal is received.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT"),
        _ = terminate => info!("Received SIGTERM"),
    }

    info!("server_shutting_down");
}
