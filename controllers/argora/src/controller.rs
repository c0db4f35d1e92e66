//! Main controller implementation.
//!
//! Wires the Kubernetes client, the configuration source and the NetBox
//! connector into one [`Reconciler`] and runs a watcher per resource kind:
//! - Update: imports devices of a single selected cluster
//! - ClusterImport: imports devices of all selected clusters (IronCore only)
//! - IPPoolImport: imports NetBox prefixes as GlobalInClusterIPPools
//! - IPAddress: writes allocated addresses back to NetBox

use std::sync::Arc;

use crds::{ClusterImport, IPAddress, IPPoolImport, Update};
use kube::{Api, Client, Resource};
use netbox_client::HttpConnector;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::backoff::ConflictBackoff;
use crate::config::{ConfigSource, FileConfigSource, OperatorSettings, ServerController};
use crate::error::ControllerError;
use crate::reconciler::{Reconciler, Stores};
use crate::trigger::Shutdown;
use crate::watcher::{WatchSettings, Watcher};

fn watched_api<K>(client: &Client, namespace: Option<&str>) -> Api<K>
where
    K: Resource<Scope = k8s_openapi::NamespaceResourceScope>,
    K::DynamicType: Default,
{
    match namespace {
        Some(ns) => Api::namespaced(client.clone(), ns),
        None => Api::all(client.clone()),
    }
}

fn watcher_result(name: &str, result: Result<Result<(), ControllerError>, tokio::task::JoinError>) -> Result<(), ControllerError> {
    result
        .map_err(|e| ControllerError::Watch(format!("{} watcher panicked: {}", name, e)))?
        .map_err(|e| ControllerError::Watch(format!("{} watcher error: {}", name, e)))
}

/// Main controller of the Argora operator.
pub struct Controller {
    update_watcher: JoinHandle<Result<(), ControllerError>>,
    cluster_import_watcher: JoinHandle<Result<(), ControllerError>>,
    ip_pool_import_watcher: JoinHandle<Result<(), ControllerError>>,
    ip_address_watcher: JoinHandle<Result<(), ControllerError>>,
}

impl Controller {
    /// Connects to Kubernetes and starts all watchers.
    pub async fn new(settings: &OperatorSettings, shutdown: Shutdown) -> Result<Self, ControllerError> {
        info!("Initializing Argora controller");

        let client = Client::try_default().await?;

        let config_source = FileConfigSource::new(&settings.config_path, &settings.credentials_path);
        // Reloaded on every pass; this only surfaces a broken mount early
        match config_source.reload() {
            Ok(config) => {
                info!("Loaded configuration: {:?}", config);
                if config.server_controller != ServerController::IronCore {
                    info!(
                        "Server controller is {:?}, ClusterImport resources will be skipped",
                        config.server_controller
                    );
                }
            }
            Err(e) => warn!("Configuration is not loadable yet, passes will fail until it is: {}", e),
        }

        let reconciler = Arc::new(Reconciler::new(
            Arc::new(config_source),
            Arc::new(HttpConnector),
            Stores::kube(client.clone()),
            ConflictBackoff::default(),
            settings.reconcile_interval,
        ));

        let namespace = settings.namespace.as_deref();
        let watcher_instance = Arc::new(Watcher::new(
            reconciler,
            watched_api::<Update>(&client, namespace),
            watched_api::<ClusterImport>(&client, namespace),
            watched_api::<IPPoolImport>(&client, namespace),
            watched_api::<IPAddress>(&client, namespace),
            WatchSettings {
                interval: settings.reconcile_interval,
                concurrency: settings.concurrency,
            },
            shutdown,
        ));

        let update_watcher = {
            let watcher = watcher_instance.clone();
            tokio::spawn(async move { watcher.watch_updates().await })
        };

        let cluster_import_watcher = {
            let watcher = watcher_instance.clone();
            tokio::spawn(async move { watcher.watch_cluster_imports().await })
        };

        let ip_pool_import_watcher = {
            let watcher = watcher_instance.clone();
            tokio::spawn(async move { watcher.watch_ip_pool_imports().await })
        };

        let ip_address_watcher = {
            let watcher = watcher_instance;
            tokio::spawn(async move { watcher.watch_ip_addresses().await })
        };

        Ok(Self {
            update_watcher,
            cluster_import_watcher,
            ip_pool_import_watcher,
            ip_address_watcher,
        })
    }

    /// Runs until the first watcher ends, which happens on shutdown.
    pub async fn run(mut self) -> Result<(), ControllerError> {
        info!("Argora controller running");

        let first = tokio::select! {
            result = &mut self.update_watcher => watcher_result("Update", result),
            result = &mut self.cluster_import_watcher => watcher_result("ClusterImport", result),
            result = &mut self.ip_pool_import_watcher => watcher_result("IPPoolImport", result),
            result = &mut self.ip_address_watcher => watcher_result("IPAddress", result),
        };
        first?;

        // The others drain their in-flight reconciliations
        for (name, handle) in [
            ("Update", self.update_watcher),
            ("ClusterImport", self.cluster_import_watcher),
            ("IPPoolImport", self.ip_pool_import_watcher),
            ("IPAddress", self.ip_address_watcher),
        ] {
            if handle.is_finished() {
                continue;
            }
            watcher_result(name, handle.await)?;
        }

        Ok(())
    }
}
