//! Floating IP Controller
//!
//! Keeps one Hetzner Cloud floating IP assigned to the server backing the
//! Kubernetes node this process runs on. Every poll interval it resolves:
//! - the node's address from the cluster's `Node` objects
//! - the Hetzner Cloud server carrying that address
//! - the floating IP with the configured address
//!
//! and assigns the floating IP to the server when it points elsewhere.

mod backoff;
mod config;
mod controller;
mod error;
mod inventory;
mod reconciler;
mod resolver;
#[cfg(test)]
mod test_utils;

use anyhow::Context;
use config::ControllerConfig;
use controller::Controller;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Configure rustls crypto provider (ring) before any TLS client is built
    if rustls::crypto::ring::default_provider().install_default().is_err() {
        warn!("rustls crypto provider was already installed");
    }

    info!("Starting Floating IP Controller v{}", env!("CARGO_PKG_VERSION"));

    let config = ControllerConfig::load().context("Failed to load configuration")?;

    info!("Configuration:");
    info!("  Floating IP: {}", config.floating_ip_address);
    info!("  Node: {} ({})", config.node_name, config.node_address_type);
    info!("  Hetzner Cloud API: {}", config.hcloud_endpoint);
    info!("  Poll interval: {}s", config.poll_interval.as_secs());
    info!("  Request timeout: {}s", config.request_timeout.as_secs());
    info!("  Error policy: {:?}", config.error_policy);
    info!(
        "  Server label selector: {}",
        config.server_label_selector.as_deref().unwrap_or("none")
    );

    let cancel = CancellationToken::new();
    tokio::spawn(cancel_on_shutdown(cancel.clone()));

    // Initialize and run controller
    let controller = Controller::new(&config)
        .await
        .context("Failed to initialize controller")?;

    if let Err(e) = controller.run(cancel).await {
        error!("Floating IP Controller terminated: {}", e);
        return Err(e.into());
    }

    Ok(())
}

/// Cancel `cancel` on SIGINT or SIGTERM.
async fn cancel_on_shutdown(cancel: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Received Ctrl+C, shutting down"),
        () = terminate => info!("Received SIGTERM, shutting down"),
    }

    cancel.cancel();
}
