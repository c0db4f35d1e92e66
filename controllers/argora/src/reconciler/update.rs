//! Update reconciler: refreshes the BMC objects of exactly one cluster per
//! selector.

use crds::Update;
use kube_runtime::controller::Action;
use tracing::info;

use super::selection::SelectionMode;
use super::{resource_key, Reconciler};
use crate::error::ControllerError;
use crate::status::{REASON_UPDATE_FAILED, REASON_UPDATE_SUCCEEDED};

impl Reconciler {
    pub async fn reconcile_update(&self, update: &Update) -> Result<Action, ControllerError> {
        info!("Reconciling Update {}", resource_key(update));
        let outcome = self.update_pass(update).await;
        self.finish_pass(
            &self.update_status,
            update,
            outcome,
            REASON_UPDATE_SUCCEEDED,
            REASON_UPDATE_FAILED,
        )
        .await
    }

    async fn update_pass(&self, update: &Update) -> Result<(), ControllerError> {
        let (config, netbox) = self.connect()?;
        self.reconcile_cluster_selectors(netbox.as_ref(), &config, &update.spec.clusters, SelectionMode::Single)
            .await
    }
}
