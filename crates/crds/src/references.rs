//! Kubernetes object references used by the foreign kinds
//!
//! Mirrors the upstream `LocalObjectReference` and
//! `TypedLocalObjectReference` shapes so the generated schemas match the
//! metal-operator and Cluster API CRDs.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Reference to an object by name, in the same namespace or cluster-scoped
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LocalObjectReference {
    pub name: String,
}

impl LocalObjectReference {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// Reference to an object by API group, kind and name
///
/// An empty `apiGroup` denotes the core group.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TypedLocalObjectReference {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_group: Option<String>,

    pub kind: String,

    pub name: String,
}

impl TypedLocalObjectReference {
    pub fn new(api_group: &str, kind: &str, name: impl Into<String>) -> Self {
        Self {
            api_group: Some(api_group.to_string()),
            kind: kind.to_string(),
            name: name.into(),
        }
    }
}
