//! Argora Operator
//!
//! Keeps a Kubernetes cluster in line with the NetBox inventory:
//! - Update / ClusterImport: BMC and BMCSecret objects per NetBox device
//! - IPPoolImport: GlobalInClusterIPPool objects per NetBox prefix
//! - IPAddress: allocated addresses written back to the device's LAG in NetBox
//!
//! Configuration and credentials are mounted files re-read on every pass.

mod backoff;
mod config;
mod controller;
mod error;
mod network;
mod reconciler;
mod status;
mod store;
#[cfg(test)]
mod test_utils;
mod trigger;
mod watcher;

use anyhow::Context;
use controller::Controller;
use tokio::sync::watch;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::OperatorSettings;
use crate::trigger::shutdown_signal;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    if rustls::crypto::ring::default_provider().install_default().is_err() {
        warn!("rustls crypto provider was already installed");
    }

    info!("Starting Argora operator");

    let settings = OperatorSettings::from_env().context("invalid operator settings")?;
    info!("Configuration:");
    info!("  Config file: {}", settings.config_path.display());
    info!("  Credentials file: {}", settings.credentials_path.display());
    info!("  Namespace: {}", settings.namespace.as_deref().unwrap_or("all namespaces"));
    info!("  Reconcile interval: {:?}", settings.reconcile_interval);
    info!("  Concurrency: {}", settings.concurrency);

    let (stop_tx, stop_rx) = watch::channel(false);
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Unable to listen for shutdown signal: {}", e);
            // Keep the sender alive, dropping it would stop the operator
            std::future::pending::<()>().await;
        }
        info!("Shutdown requested, draining reconciliations");
        let _ = stop_tx.send(true);
    });

    let controller = Controller::new(&settings, shutdown_signal(stop_rx))
        .await
        .context("unable to start controller")?;
    controller.run().await?;

    info!("Argora operator stopped");
    Ok(())
}
