//! GlobalInClusterIPPool: cluster-wide pool of the in-cluster IPAM provider

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(CustomResource, Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[kube(
    group = "ipam.cluster.x-k8s.io",
    version = "v1alpha2",
    kind = "GlobalInClusterIPPool"
)]
#[serde(rename_all = "camelCase")]
pub struct GlobalInClusterIPPoolSpec {
    /// Addresses, ranges or CIDRs handed out by the pool
    pub addresses: Vec<String>,

    /// Prefix length of allocated addresses
    pub prefix: u8,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gateway: Option<String>,

    /// Addresses, ranges or CIDRs never handed out
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub excluded_addresses: Vec<String>,
}
