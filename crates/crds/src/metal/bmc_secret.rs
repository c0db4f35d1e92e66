//! BMCSecret: credentials of a BMC
//!
//! Shaped like a core `Secret` (top-level `data`, no `spec`), so the
//! `CustomResource` derive does not apply and `Resource` is implemented by
//! hand.

use std::borrow::Cow;
use std::collections::BTreeMap;

use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use k8s_openapi::{ByteString, ClusterResourceScope};
use kube::api::TypeMeta;
use kube::Resource;
use serde::{Deserialize, Serialize};

use super::{METAL_GROUP, METAL_VERSION};

/// Key of the username entry in `data`
pub const BMC_SECRET_USERNAME_KEY: &str = "username";
/// Key of the password entry in `data`
pub const BMC_SECRET_PASSWORD_KEY: &str = "password";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct BMCSecret {
    #[serde(flatten, default, skip_serializing_if = "Option::is_none")]
    pub types: Option<TypeMeta>,

    #[serde(default)]
    pub metadata: ObjectMeta,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub data: BTreeMap<String, ByteString>,
}

impl BMCSecret {
    /// Build a credentials object holding `username` and `password`
    pub fn new(name: &str, username: &str, password: &str) -> Self {
        let mut data = BTreeMap::new();
        data.insert(
            BMC_SECRET_USERNAME_KEY.to_string(),
            ByteString(username.as_bytes().to_vec()),
        );
        data.insert(
            BMC_SECRET_PASSWORD_KEY.to_string(),
            ByteString(password.as_bytes().to_vec()),
        );
        Self {
            types: Some(TypeMeta {
                api_version: format!("{METAL_GROUP}/{METAL_VERSION}"),
                kind: "BMCSecret".to_string(),
            }),
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                ..Default::default()
            },
            data,
        }
    }
}

impl Resource for BMCSecret {
    type DynamicType = ();
    type Scope = ClusterResourceScope;

    fn kind(_: &()) -> Cow<'_, str> {
        Cow::Borrowed("BMCSecret")
    }

    fn group(_: &()) -> Cow<'_, str> {
        Cow::Borrowed(METAL_GROUP)
    }

    fn version(_: &()) -> Cow<'_, str> {
        Cow::Borrowed(METAL_VERSION)
    }

    fn plural(_: &()) -> Cow<'_, str> {
        Cow::Borrowed("bmcsecrets")
    }

    fn meta(&self) -> &ObjectMeta {
        &self.metadata
    }

    fn meta_mut(&mut self) -> &mut ObjectMeta {
        &mut self.metadata
    }
}
