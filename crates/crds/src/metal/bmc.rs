//! BMC: out-of-band management endpoint of a bare-metal host

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::references::LocalObjectReference;

/// Port used for Redfish endpoints
pub const REDFISH_PORT: i32 = 443;

#[derive(CustomResource, Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
#[kube(group = "metal.ironcore.dev", version = "v1alpha1", kind = "BMC")]
#[serde(rename_all = "camelCase")]
pub struct BMCSpec {
    /// Reference to a separate endpoint object (unused by Argora)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint_ref: Option<LocalObjectReference>,

    /// Inline endpoint
    #[serde(default, rename = "access", skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<InlineEndpoint>,

    pub bmc_secret_ref: LocalObjectReference,

    pub protocol: Protocol,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct InlineEndpoint {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mac_address: Option<String>,

    pub ip: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Protocol {
    pub name: ProtocolName,
    pub port: i32,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub enum ProtocolName {
    #[default]
    Redfish,
    IPMI,
    SSH,
}

impl Protocol {
    pub fn redfish() -> Self {
        Self {
            name: ProtocolName::Redfish,
            port: REDFISH_PORT,
        }
    }
}
