//! IPAddress: an address allocated from a pool for a claim

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::references::{LocalObjectReference, TypedLocalObjectReference};

#[derive(CustomResource, Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
#[kube(
    group = "ipam.cluster.x-k8s.io",
    version = "v1beta1",
    kind = "IPAddress",
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct IPAddressSpec {
    /// Claim this address was allocated for
    pub claim_ref: LocalObjectReference,

    /// Pool this address was allocated from
    pub pool_ref: TypedLocalObjectReference,

    /// Bare address without prefix length
    pub address: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefix: Option<u8>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gateway: Option<String>,
}
