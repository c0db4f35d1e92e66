//! Declarative selectors expanded into NetBox queries

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Cluster filter. Empty fields act as wildcards.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ClusterSelector {
    /// Cluster name
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,

    /// Region slug
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub region: String,

    /// Cluster type slug
    #[serde(default, rename = "type", skip_serializing_if = "String::is_empty")]
    pub cluster_type: String,
}

/// IP pool filter: one pool is created per prefix matching `{region, role}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct IPPoolSelector {
    /// Pool names become `<namePrefix>-<site>` (or the compute transit form)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name_prefix: Option<String>,

    /// Use this name verbatim instead of deriving one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name_override: Option<String>,

    /// Region slug
    pub region: String,

    /// Prefix role slug
    pub role: String,

    /// Exclude `<network>/<excludeMask>` from the pool
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclude_mask: Option<u8>,

    /// Addresses or ranges excluded verbatim
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub excluded_addresses: Vec<String>,

    /// Exclude the last N usable host addresses of the prefix
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclude_last_n_addresses: Option<u32>,
}

/// Selector validation failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SelectorError {
    #[error("either namePrefix or nameOverride must be set for ip pool selector (region {region}, role {role})")]
    MissingName { region: String, role: String },

    #[error("namePrefix and nameOverride are mutually exclusive for ip pool selector (region {region}, role {role})")]
    AmbiguousName { region: String, role: String },
}

impl IPPoolSelector {
    /// Exactly one of `namePrefix` / `nameOverride` must be set
    pub fn validate(&self) -> Result<(), SelectorError> {
        let prefix = self.name_prefix.as_deref().is_some_and(|s| !s.is_empty());
        let override_ = self.name_override.as_deref().is_some_and(|s| !s.is_empty());
        match (prefix, override_) {
            (true, false) | (false, true) => Ok(()),
            (false, false) => Err(SelectorError::MissingName {
                region: self.region.clone(),
                role: self.role.clone(),
            }),
            (true, true) => Err(SelectorError::AmbiguousName {
                region: self.region.clone(),
                role: self.role.clone(),
            }),
        }
    }

    /// The name fragment used in logs and error context
    pub fn display_name(&self) -> &str {
        self.name_override
            .as_deref()
            .or(self.name_prefix.as_deref())
            .unwrap_or_default()
    }
}
