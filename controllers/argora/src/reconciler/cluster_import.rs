//! ClusterImport reconciler
//!
//! Imports the devices of every matching cluster. Only active when the
//! configured server controller is IronCore; a `ClusterImport` without
//! selectors uses the `ironCore` selectors of the configuration.

use crds::ClusterImport;
use kube_runtime::controller::Action;
use tracing::info;

use super::selection::SelectionMode;
use super::{resource_key, Reconciler};
use crate::config::ServerController;
use crate::error::ControllerError;
use crate::status::{REASON_CLUSTER_IMPORT_FAILED, REASON_CLUSTER_IMPORT_SUCCEEDED};

impl Reconciler {
    pub async fn reconcile_cluster_import(&self, cluster_import: &ClusterImport) -> Result<Action, ControllerError> {
        let key = resource_key(cluster_import);
        info!("Reconciling ClusterImport {}", key);

        let outcome = match self.connect() {
            Ok((config, _)) if config.server_controller != ServerController::IronCore => {
                info!(
                    "Server controller is {:?}, skipping ClusterImport {}",
                    config.server_controller, key
                );
                return Ok(Action::requeue(self.reconcile_interval));
            }
            Ok((config, netbox)) => {
                let selectors = if cluster_import.spec.clusters.is_empty() {
                    &config.iron_core
                } else {
                    &cluster_import.spec.clusters
                };
                self.reconcile_cluster_selectors(netbox.as_ref(), &config, selectors, SelectionMode::Multiple)
                    .await
            }
            Err(err) => Err(err),
        };

        self.finish_pass(
            &self.cluster_import_status,
            cluster_import,
            outcome,
            REASON_CLUSTER_IMPORT_SUCCEEDED,
            REASON_CLUSTER_IMPORT_FAILED,
        )
        .await
    }
}
