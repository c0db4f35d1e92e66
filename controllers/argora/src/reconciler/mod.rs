//! Reconciliation logic for the Argora resources.
//!
//! This module is organized by engine:
//! - `selection`: cluster and prefix selectors expanded into NetBox queries
//! - `device`: BMC and BMCSecret objects per NetBox device
//! - `ip_pool`: GlobalInClusterIPPool objects per NetBox prefix
//! - `ip_address`: IPAddress objects written back to NetBox
//! - `update`, `cluster_import`, `ip_pool_import`: one pass per custom resource
//!
//! Every pass reloads configuration and credentials and reconnects to
//! NetBox, so no inventory state is cached between passes.

pub mod cluster_import;
pub mod device;
pub mod ip_address;
pub mod ip_pool;
pub mod ip_pool_import;
#[cfg(test)]
mod ip_pool_test;
pub mod selection;
pub mod update;

use std::sync::Arc;
use std::time::Duration;

use crds::{
    BMCSecret, ClusterImport, GlobalInClusterIPPool, HasReconcileStatus, IPAddressClaim, IPPoolImport, Server,
    ServerClaim, Update, BMC,
};
use kube::{Client, Resource, ResourceExt};
use kube_runtime::controller::Action;
use netbox_client::{NetBox, NetBoxConnector};
use tracing::{error, info};

use crate::backoff::{ConflictBackoff, RequeueLimiter};
use crate::config::{Config, ConfigSource};
use crate::error::ControllerError;
use crate::status::{ReasonWithMessage, StatusReporter};
use crate::store::{KubeStore, ObjectStore};

/// Object stores of every kind the reconcilers read or write
pub struct Stores {
    pub bmcs: Arc<dyn ObjectStore<BMC>>,
    pub bmc_secrets: Arc<dyn ObjectStore<BMCSecret>>,
    pub ip_pools: Arc<dyn ObjectStore<GlobalInClusterIPPool>>,
    pub ip_address_claims: Arc<dyn ObjectStore<IPAddressClaim>>,
    pub server_claims: Arc<dyn ObjectStore<ServerClaim>>,
    pub servers: Arc<dyn ObjectStore<Server>>,
    pub updates: Arc<dyn ObjectStore<Update>>,
    pub cluster_imports: Arc<dyn ObjectStore<ClusterImport>>,
    pub ip_pool_imports: Arc<dyn ObjectStore<IPPoolImport>>,
}

impl Stores {
    /// Stores backed by the Kubernetes API
    pub fn kube(client: Client) -> Self {
        Self {
            bmcs: Arc::new(KubeStore::<BMC>::cluster(client.clone())),
            bmc_secrets: Arc::new(KubeStore::<BMCSecret>::cluster(client.clone())),
            ip_pools: Arc::new(KubeStore::<GlobalInClusterIPPool>::cluster(client.clone())),
            ip_address_claims: Arc::new(KubeStore::<IPAddressClaim>::namespaced(client.clone())),
            server_claims: Arc::new(KubeStore::<ServerClaim>::namespaced(client.clone())),
            servers: Arc::new(KubeStore::<Server>::cluster(client.clone())),
            updates: Arc::new(KubeStore::<Update>::namespaced(client.clone())),
            cluster_imports: Arc::new(KubeStore::<ClusterImport>::namespaced(client.clone())),
            ip_pool_imports: Arc::new(KubeStore::<IPPoolImport>::namespaced(client)),
        }
    }
}

/// Reconciles Argora resources against NetBox.
pub struct Reconciler {
    pub(crate) config_source: Arc<dyn ConfigSource>,
    pub(crate) connector: Arc<dyn NetBoxConnector>,
    pub(crate) bmcs: Arc<dyn ObjectStore<BMC>>,
    pub(crate) bmc_secrets: Arc<dyn ObjectStore<BMCSecret>>,
    pub(crate) ip_pools: Arc<dyn ObjectStore<GlobalInClusterIPPool>>,
    pub(crate) ip_address_claims: Arc<dyn ObjectStore<IPAddressClaim>>,
    pub(crate) server_claims: Arc<dyn ObjectStore<ServerClaim>>,
    pub(crate) servers: Arc<dyn ObjectStore<Server>>,
    pub(crate) update_status: StatusReporter<Update>,
    pub(crate) cluster_import_status: StatusReporter<ClusterImport>,
    pub(crate) ip_pool_import_status: StatusReporter<IPPoolImport>,
    /// Requeue delays of failed resource keys, shared by all controllers
    pub(crate) limiter: RequeueLimiter,
    pub(crate) reconcile_interval: Duration,
}

impl Reconciler {
    pub fn new(
        config_source: Arc<dyn ConfigSource>,
        connector: Arc<dyn NetBoxConnector>,
        stores: Stores,
        conflict_backoff: ConflictBackoff,
        reconcile_interval: Duration,
    ) -> Self {
        Self {
            config_source,
            connector,
            bmcs: stores.bmcs,
            bmc_secrets: stores.bmc_secrets,
            ip_pools: stores.ip_pools,
            ip_address_claims: stores.ip_address_claims,
            server_claims: stores.server_claims,
            servers: stores.servers,
            update_status: StatusReporter::new(stores.updates, conflict_backoff),
            cluster_import_status: StatusReporter::new(stores.cluster_imports, conflict_backoff),
            ip_pool_import_status: StatusReporter::new(stores.ip_pool_imports, conflict_backoff),
            limiter: RequeueLimiter::default(),
            reconcile_interval,
        }
    }

    /// Fresh configuration snapshot and NetBox connection for one pass
    pub(crate) fn connect(&self) -> Result<(Config, Arc<dyn NetBox>), ControllerError> {
        let config = self.config_source.reload()?;
        let netbox = self.connector.connect(&config.netbox_url, &config.netbox_token)?;
        Ok((config, netbox))
    }

    /// Record the outcome of a pass on `resource`.
    ///
    /// Success sets the `succeeded` condition and state `Ready`. Failure sets
    /// the `failed` condition with the error text, state `Error`, and hands
    /// the error back to the runtime for a rate-limited requeue.
    pub(crate) async fn finish_pass<K>(
        &self,
        reporter: &StatusReporter<K>,
        resource: &K,
        outcome: Result<(), ControllerError>,
        succeeded: &str,
        failed: &str,
    ) -> Result<Action, ControllerError>
    where
        K: Resource + HasReconcileStatus + Clone + Send + Sync + 'static,
        K::DynamicType: Default,
    {
        let mut resource = resource.clone();
        let kind = K::kind(&Default::default()).to_string();
        let namespace = resource.namespace().unwrap_or_default();
        let name = resource.name_any();

        match outcome {
            Ok(()) => {
                reporter.set_condition(&mut resource, &ReasonWithMessage::new(succeeded));
                reporter.update_to_ready(&resource).await?;
                info!("Reconciled {} {}/{}", kind, namespace, name);
                Ok(Action::requeue(self.reconcile_interval))
            }
            Err(err) => {
                error!("Failed to reconcile {} {}/{}: {}", kind, namespace, name, err);
                reporter.set_condition(
                    &mut resource,
                    &ReasonWithMessage::new(failed).with_message(err.to_string()),
                );
                if let Err(status_err) = reporter.update_to_error(&resource, &err).await {
                    error!(
                        "Failed to update status of {} {}/{}: {}",
                        kind, namespace, name, status_err
                    );
                }
                Err(err)
            }
        }
    }
}

/// `<namespace>/<name>` of a resource, or its name alone if cluster-scoped
pub(crate) fn resource_key<K: Resource>(resource: &K) -> String {
    match resource.meta().namespace.as_deref() {
        Some(namespace) => format!("{}/{}", namespace, resource.meta().name.as_deref().unwrap_or_default()),
        None => resource.meta().name.clone().unwrap_or_default(),
    }
}
