//! ServerClaim: a namespaced request binding one Server

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::references::LocalObjectReference;

#[derive(CustomResource, Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
#[kube(group = "metal.ironcore.dev", version = "v1alpha1", kind = "ServerClaim", namespaced)]
#[serde(rename_all = "camelCase")]
pub struct ServerClaimSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub power: Option<String>,

    /// Bound server, unset until the claim is bound
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_ref: Option<LocalObjectReference>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}
