//! IPAddressClaim: a request for an address from a pool

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::references::{LocalObjectReference, TypedLocalObjectReference};

#[derive(CustomResource, Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
#[kube(
    group = "ipam.cluster.x-k8s.io",
    version = "v1beta1",
    kind = "IPAddressClaim",
    namespaced,
    status = "IPAddressClaimStatus"
)]
#[serde(rename_all = "camelCase")]
pub struct IPAddressClaimSpec {
    pub pool_ref: TypedLocalObjectReference,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct IPAddressClaimStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address_ref: Option<LocalObjectReference>,
}
