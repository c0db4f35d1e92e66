//! IPPoolImport reconciler: one `GlobalInClusterIPPool` per matching prefix.

use crds::IPPoolImport;
use kube_runtime::controller::Action;
use tracing::info;

use super::{resource_key, Reconciler};
use crate::error::ControllerError;
use crate::status::{REASON_IP_POOL_IMPORT_FAILED, REASON_IP_POOL_IMPORT_SUCCEEDED};

impl Reconciler {
    pub async fn reconcile_ip_pool_import(&self, ip_pool_import: &IPPoolImport) -> Result<Action, ControllerError> {
        info!("Reconciling IPPoolImport {}", resource_key(ip_pool_import));
        let outcome = match self.connect() {
            Ok((_, netbox)) => {
                self.reconcile_ip_pool_selectors(netbox.as_ref(), &ip_pool_import.spec.ip_pools)
                    .await
            }
            Err(err) => Err(err),
        };
        self.finish_pass(
            &self.ip_pool_import_status,
            ip_pool_import,
            outcome,
            REASON_IP_POOL_IMPORT_SUCCEEDED,
            REASON_IP_POOL_IMPORT_FAILED,
        )
        .await
    }
}
