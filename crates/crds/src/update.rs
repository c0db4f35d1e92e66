//! Update CRD
//!
//! Imports the devices of exactly one NetBox cluster per selector as BMC
//! objects. A selector matching more than one cluster is an error.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::selectors::ClusterSelector;
use crate::status::ReconcileStatus;

#[derive(CustomResource, Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "argora.cloud.sap",
    version = "v1alpha1",
    kind = "Update",
    namespaced,
    status = "ReconcileStatus",
    printcolumn = r#"{"name":"State","type":"string","jsonPath":".status.state"}"#,
    printcolumn = r#"{"name":"Description","type":"string","jsonPath":".status.description"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSpec {
    /// Clusters to import, each resolving to a single NetBox cluster
    #[serde(default)]
    pub clusters: Vec<ClusterSelector>,
}
