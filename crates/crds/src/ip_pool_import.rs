//! IPPoolImport CRD
//!
//! Creates one `GlobalInClusterIPPool` per NetBox prefix matching each
//! selector.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::selectors::IPPoolSelector;
use crate::status::ReconcileStatus;

#[derive(CustomResource, Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "argora.cloud.sap",
    version = "v1alpha1",
    kind = "IPPoolImport",
    namespaced,
    status = "ReconcileStatus",
    printcolumn = r#"{"name":"State","type":"string","jsonPath":".status.state"}"#,
    printcolumn = r#"{"name":"Description","type":"string","jsonPath":".status.description"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct IPPoolImportSpec {
    #[serde(default)]
    pub ip_pools: Vec<IPPoolSelector>,
}
