//! Kubernetes object store
//!
//! Reconcilers read and write objects through [`ObjectStore`] instead of
//! `kube::Api` directly, so tests can run against an in-memory store.
//! `AlreadyExists` and `Conflict` are distinct error classes: creation
//! treats the former as converged state, status writes retry the latter.

use std::fmt::Debug;
use std::marker::PhantomData;

use async_trait::async_trait;
use k8s_openapi::{ClusterResourceScope, NamespaceResourceScope};
use kube::api::{DeleteParams, ListParams, Patch, PatchParams, PostParams};
use kube::{Api, Client, Resource, ResourceExt};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::json;
use thiserror::Error;
use tracing::debug;

/// Object store errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{0} already exists")]
    AlreadyExists(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("invalid object: {0}")]
    Invalid(String),

    #[error(transparent)]
    Kube(kube::Error),
}

impl StoreError {
    pub fn is_already_exists(&self) -> bool {
        matches!(self, StoreError::AlreadyExists(_))
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::Conflict(_))
    }
}

impl From<kube::Error> for StoreError {
    fn from(error: kube::Error) -> Self {
        match &error {
            kube::Error::Api(response) if response.code == 409 && response.reason == "AlreadyExists" => {
                StoreError::AlreadyExists(response.message.clone())
            }
            kube::Error::Api(response) if response.code == 409 => StoreError::Conflict(response.message.clone()),
            kube::Error::Api(response) if response.code == 404 => StoreError::NotFound(response.message.clone()),
            _ => StoreError::Kube(error),
        }
    }
}

/// Typed access to Kubernetes objects of kind `K`.
///
/// `namespace` is ignored for cluster-scoped kinds; `None` on a namespaced
/// kind lists across all namespaces.
#[async_trait]
pub trait ObjectStore<K>: Send + Sync
where
    K: Resource + Clone + Send + Sync + 'static,
{
    async fn get(&self, namespace: Option<&str>, name: &str) -> Result<Option<K>, StoreError>;

    async fn create(&self, object: &K) -> Result<K, StoreError>;

    /// Merge-patch the labels and owner references of `object`
    async fn patch(&self, object: &K) -> Result<K, StoreError>;

    /// Write the status of `object`, failing with `Conflict` if its
    /// resourceVersion is stale
    async fn replace_status(&self, object: &K) -> Result<K, StoreError>;

    async fn delete(&self, namespace: Option<&str>, name: &str) -> Result<(), StoreError>;

    async fn list(&self, namespace: Option<&str>) -> Result<Vec<K>, StoreError>;
}

type ApiFactory<K> = fn(Client, Option<&str>) -> Api<K>;

/// [`ObjectStore`] backed by the Kubernetes API
pub struct KubeStore<K> {
    client: Client,
    api: ApiFactory<K>,
    _kind: PhantomData<fn() -> K>,
}

impl<K> Clone for KubeStore<K> {
    fn clone(&self) -> Self {
        Self {
            client: self.client.clone(),
            api: self.api,
            _kind: PhantomData,
        }
    }
}

fn namespaced_api<K>(client: Client, namespace: Option<&str>) -> Api<K>
where
    K: Resource<Scope = NamespaceResourceScope>,
    K::DynamicType: Default,
{
    match namespace {
        Some(ns) => Api::namespaced(client, ns),
        None => Api::all(client),
    }
}

fn cluster_api<K>(client: Client, _namespace: Option<&str>) -> Api<K>
where
    K: Resource<Scope = ClusterResourceScope>,
    K::DynamicType: Default,
{
    Api::all(client)
}

impl<K> KubeStore<K>
where
    K: Resource<Scope = NamespaceResourceScope>,
    K::DynamicType: Default,
{
    pub fn namespaced(client: Client) -> Self {
        Self {
            client,
            api: namespaced_api::<K>,
            _kind: PhantomData,
        }
    }
}

impl<K> KubeStore<K>
where
    K: Resource<Scope = ClusterResourceScope>,
    K::DynamicType: Default,
{
    pub fn cluster(client: Client) -> Self {
        Self {
            client,
            api: cluster_api::<K>,
            _kind: PhantomData,
        }
    }
}

impl<K> KubeStore<K> {
    fn api(&self, namespace: Option<&str>) -> Api<K> {
        (self.api)(self.client.clone(), namespace)
    }
}

fn object_name<K>(object: &K) -> Result<String, StoreError>
where
    K: Resource,
    K::DynamicType: Default,
{
    object
        .meta()
        .name
        .clone()
        .ok_or_else(|| StoreError::Invalid(format!("{} without metadata.name", K::kind(&Default::default()))))
}

#[async_trait]
impl<K> ObjectStore<K> for KubeStore<K>
where
    K: Resource + Clone + Debug + Serialize + DeserializeOwned + Send + Sync + 'static,
    K::DynamicType: Default,
{
    async fn get(&self, namespace: Option<&str>, name: &str) -> Result<Option<K>, StoreError> {
        Ok(self.api(namespace).get_opt(name).await?)
    }

    async fn create(&self, object: &K) -> Result<K, StoreError> {
        debug!("Creating {} {}", K::kind(&Default::default()), object.name_any());
        Ok(self
            .api(object.namespace().as_deref())
            .create(&PostParams::default(), object)
            .await?)
    }

    async fn patch(&self, object: &K) -> Result<K, StoreError> {
        let name = object_name(object)?;
        let meta = object.meta();
        // Unset fields are left out; a null would clear them on the server
        let mut metadata = serde_json::Map::new();
        if let Some(labels) = &meta.labels {
            metadata.insert("labels".to_string(), json!(labels));
        }
        if let Some(owner_references) = &meta.owner_references {
            metadata.insert("ownerReferences".to_string(), json!(owner_references));
        }
        let patch = json!({ "metadata": metadata });
        Ok(self
            .api(meta.namespace.as_deref())
            .patch(&name, &PatchParams::default(), &Patch::Merge(&patch))
            .await?)
    }

    async fn replace_status(&self, object: &K) -> Result<K, StoreError> {
        let name = object_name(object)?;
        let value = serde_json::to_value(object).map_err(|e| StoreError::Invalid(e.to_string()))?;
        // resourceVersion turns the merge patch into a precondition
        let patch = json!({
            "metadata": { "resourceVersion": object.meta().resource_version },
            "status": value.get("status").cloned().unwrap_or_default(),
        });
        Ok(self
            .api(object.meta().namespace.as_deref())
            .patch_status(&name, &PatchParams::default(), &Patch::Merge(&patch))
            .await?)
    }

    async fn delete(&self, namespace: Option<&str>, name: &str) -> Result<(), StoreError> {
        self.api(namespace).delete(name, &DeleteParams::default()).await?;
        Ok(())
    }

    async fn list(&self, namespace: Option<&str>) -> Result<Vec<K>, StoreError> {
        Ok(self.api(namespace).list(&ListParams::default()).await?.items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kube::core::ErrorResponse;

    fn api_error(code: u16, reason: &str) -> kube::Error {
        kube::Error::Api(ErrorResponse {
            status: "Failure".to_string(),
            message: format!("{} happened", reason),
            reason: reason.to_string(),
            code,
        })
    }

    #[test]
    fn test_kube_errors_map_to_classes() {
        assert!(StoreError::from(api_error(409, "AlreadyExists")).is_already_exists());
        assert!(StoreError::from(api_error(409, "Conflict")).is_conflict());
        assert!(matches!(StoreError::from(api_error(404, "NotFound")), StoreError::NotFound(_)));
        assert!(matches!(StoreError::from(api_error(500, "InternalError")), StoreError::Kube(_)));
    }
}
