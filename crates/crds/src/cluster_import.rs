//! ClusterImport CRD
//!
//! Imports the devices of every NetBox cluster matching its selectors.
//! Without selectors the operator falls back to the `ironCore` selectors of
//! its configuration.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::selectors::ClusterSelector;
use crate::status::ReconcileStatus;

#[derive(CustomResource, Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "argora.cloud.sap",
    version = "v1alpha1",
    kind = "ClusterImport",
    namespaced,
    status = "ReconcileStatus",
    printcolumn = r#"{"name":"State","type":"string","jsonPath":".status.state"}"#,
    printcolumn = r#"{"name":"Description","type":"string","jsonPath":".status.description"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct ClusterImportSpec {
    #[serde(default)]
    pub clusters: Vec<ClusterSelector>,
}
