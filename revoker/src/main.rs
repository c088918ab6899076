//! Enrollment revoker web server.
//!
//! Receives Shopify `orders/cancelled` webhooks and removes the matching
//! LearnWorlds enrollments.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::{net::TcpListener, signal};
use tracing::{info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use revoker::web::{router, AppState, WEBHOOK_PATH};
use revoker::{Config, LearnWorldsClient};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize structured JSON logging
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().json().flatten_event(true))
        .init();

    info!("web_server_starting");

    // Load configuration
    let config = Config::from_env();
    info!(
        port = config.port,
        webhook_secret_configured = !config.shopify_webhook_secret.trim().is_empty(),
        learnworlds_api_base = %config.learnworlds_api_base,
        learnworlds_token_configured = !config.learnworlds_api_token.trim().is_empty(),
        learnworlds_client_id_configured = config.learnworlds_client_id.is_some(),
        sku_mappings = config.sku_to_course_id.len(),
        request_timeout_ms = config.request_timeout_ms,
        "config_loaded"
    );

    // Incomplete configuration is reported per request, not at startup
    if let Err(e) = config.check_required() {
        warn!(error = %e, "config_incomplete");
    }

    let platform =
        LearnWorldsClient::from_config(&config).context("Failed to build LearnWorlds client")?;

    let state = AppState::new(config.clone(), Arc::new(platform));
    let app = router(state);

    // Bind to address
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    info!(address = %addr, webhook_path = WEBHOOK_PATH, "web_server_listening");

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("web_server_shutdown_complete");

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

    info!("web_server_shutting_down");
}
