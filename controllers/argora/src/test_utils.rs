//! Test utilities for unit testing reconcilers
//!
//! This module provides an in-memory object store, a static config source
//! and helpers for creating test resources.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use crds::*;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ObjectMeta, OwnerReference};
use kube::{Resource, ResourceExt};
use netbox_client::MockNetBoxClient;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::backoff::ConflictBackoff;
use crate::config::{Config, ConfigError, ConfigSource, ServerController};
use crate::reconciler::{Reconciler, Stores};
use crate::store::{ObjectStore, StoreError};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}

type ObjectKey = (Option<String>, String);

/// In-memory [`ObjectStore`] with resourceVersion checks on status writes
#[derive(Debug)]
pub struct MemoryStore<K> {
    objects: Mutex<BTreeMap<ObjectKey, K>>,
    resource_version: Mutex<u64>,
    conflicts: Mutex<u32>,
    failures: Mutex<HashMap<String, String>>,
    calls: Mutex<HashMap<String, usize>>,
}

impl<K> Default for MemoryStore<K> {
    fn default() -> Self {
        Self {
            objects: Mutex::new(BTreeMap::new()),
            resource_version: Mutex::new(0),
            conflicts: Mutex::new(0),
            failures: Mutex::new(HashMap::new()),
            calls: Mutex::new(HashMap::new()),
        }
    }
}

fn key_of<K: Resource>(object: &K) -> ObjectKey {
    (object.meta().namespace.clone(), object.meta().name.clone().unwrap_or_default())
}

impl<K> MemoryStore<K>
where
    K: Resource + Clone + Serialize + DeserializeOwned,
{
    pub fn new() -> Self {
        Self::default()
    }

    fn next_resource_version(&self) -> String {
        let mut version = lock(&self.resource_version);
        *version += 1;
        version.to_string()
    }

    /// Store `object` as if it had been created by someone else
    pub fn insert(&self, mut object: K) -> K {
        let name = object.name_any();
        let meta = object.meta_mut();
        meta.resource_version = Some(self.next_resource_version());
        meta.uid.get_or_insert_with(|| format!("uid-{}", name));
        lock(&self.objects).insert(key_of(&object), object.clone());
        object
    }

    pub fn get_stored(&self, namespace: Option<&str>, name: &str) -> Option<K> {
        lock(&self.objects)
            .get(&(namespace.map(ToString::to_string), name.to_string()))
            .cloned()
    }

    /// All stored objects, ordered by namespace and name
    pub fn all(&self) -> Vec<K> {
        lock(&self.objects).values().cloned().collect()
    }

    /// Fail the next `count` status writes with a conflict
    pub fn inject_conflicts(&self, count: u32) {
        *lock(&self.conflicts) = count;
    }

    /// Make `operation` fail with `message` until cleared
    pub fn fail_on(&self, operation: &str, message: &str) {
        lock(&self.failures).insert(operation.to_string(), message.to_string());
    }

    /// Number of calls of `operation` so far
    pub fn calls(&self, operation: &str) -> usize {
        lock(&self.calls).get(operation).copied().unwrap_or(0)
    }

    fn record(&self, operation: &str) -> Result<(), StoreError> {
        *lock(&self.calls).entry(operation.to_string()).or_insert(0) += 1;
        match lock(&self.failures).get(operation) {
            Some(message) => Err(StoreError::Invalid(message.clone())),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl<K> ObjectStore<K> for MemoryStore<K>
where
    K: Resource + Clone + Serialize + DeserializeOwned + Send + Sync + 'static,
{
    async fn get(&self, namespace: Option<&str>, name: &str) -> Result<Option<K>, StoreError> {
        self.record("get")?;
        Ok(self.get_stored(namespace, name))
    }

    async fn create(&self, object: &K) -> Result<K, StoreError> {
        self.record("create")?;
        let key = key_of(object);
        if lock(&self.objects).contains_key(&key) {
            return Err(StoreError::AlreadyExists(key.1));
        }
        Ok(self.insert(object.clone()))
    }

    async fn patch(&self, object: &K) -> Result<K, StoreError> {
        self.record("patch")?;
        let key = key_of(object);
        let version = self.next_resource_version();
        let mut objects = lock(&self.objects);
        let stored = objects
            .get_mut(&key)
            .ok_or_else(|| StoreError::NotFound(key.1.clone()))?;
        let meta = object.meta();
        if let Some(labels) = &meta.labels {
            stored.meta_mut().labels = Some(labels.clone());
        }
        if let Some(owner_references) = &meta.owner_references {
            stored.meta_mut().owner_references = Some(owner_references.clone());
        }
        stored.meta_mut().resource_version = Some(version);
        Ok(stored.clone())
    }

    async fn replace_status(&self, object: &K) -> Result<K, StoreError> {
        self.record("replace_status")?;
        {
            let mut conflicts = lock(&self.conflicts);
            if *conflicts > 0 {
                *conflicts -= 1;
                return Err(StoreError::Conflict("injected conflict".to_string()));
            }
        }

        let key = key_of(object);
        let version = self.next_resource_version();
        let mut objects = lock(&self.objects);
        let stored = objects
            .get_mut(&key)
            .ok_or_else(|| StoreError::NotFound(key.1.clone()))?;
        if object.meta().resource_version.is_some() && object.meta().resource_version != stored.meta().resource_version {
            return Err(StoreError::Conflict(format!("{} has been modified", key.1)));
        }

        let mut merged = serde_json::to_value(&*stored).map_err(|e| StoreError::Invalid(e.to_string()))?;
        let status = serde_json::to_value(object)
            .map_err(|e| StoreError::Invalid(e.to_string()))?
            .get("status")
            .cloned()
            .unwrap_or_default();
        merged["status"] = status;
        let mut updated: K = serde_json::from_value(merged).map_err(|e| StoreError::Invalid(e.to_string()))?;
        updated.meta_mut().resource_version = Some(version);
        *stored = updated.clone();
        Ok(updated)
    }

    async fn delete(&self, namespace: Option<&str>, name: &str) -> Result<(), StoreError> {
        self.record("delete")?;
        lock(&self.objects)
            .remove(&(namespace.map(ToString::to_string), name.to_string()))
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound(name.to_string()))
    }

    async fn list(&self, namespace: Option<&str>) -> Result<Vec<K>, StoreError> {
        self.record("list")?;
        Ok(lock(&self.objects)
            .iter()
            .filter(|((ns, _), _)| namespace.is_none() || ns.as_deref() == namespace)
            .map(|(_, object)| object.clone())
            .collect())
    }
}

/// [`ConfigSource`] returning a settable snapshot
#[derive(Debug)]
pub struct StaticConfigSource {
    config: Mutex<Config>,
    failure: Mutex<Option<&'static str>>,
    reloads: Mutex<usize>,
}

impl StaticConfigSource {
    pub fn new(config: Config) -> Self {
        Self {
            config: Mutex::new(config),
            failure: Mutex::new(None),
            reloads: Mutex::new(0),
        }
    }

    pub fn set(&self, config: Config) {
        *lock(&self.config) = config;
    }

    /// Make reloads fail as if `field` were missing
    pub fn fail_missing(&self, field: &'static str) {
        *lock(&self.failure) = Some(field);
    }

    pub fn reloads(&self) -> usize {
        *lock(&self.reloads)
    }
}

impl ConfigSource for StaticConfigSource {
    fn reload(&self) -> Result<Config, ConfigError> {
        *lock(&self.reloads) += 1;
        if let Some(field) = *lock(&self.failure) {
            return Err(ConfigError::Missing(field));
        }
        Ok(lock(&self.config).clone())
    }
}

/// Backoff without delays worth waiting for
pub fn fast_backoff() -> ConflictBackoff {
    ConflictBackoff {
        steps: 4,
        duration: Duration::from_millis(1),
        factor: 1.0,
        jitter: 0.0,
    }
}

/// Config pointing at the mock NetBox
pub fn create_test_config() -> Config {
    Config {
        server_controller: ServerController::IronCore,
        iron_core: Vec::new(),
        netbox_url: "http://netbox.mock".to_string(),
        netbox_token: "token".to_string(),
        bmc_user: "admin".to_string(),
        bmc_password: "hunter2".to_string(),
    }
}

/// A reconciler wired to in-memory collaborators, with handles on all of
/// them for setup and assertions
pub struct TestHarness {
    pub reconciler: Reconciler,
    pub netbox: MockNetBoxClient,
    pub config: Arc<StaticConfigSource>,
    pub bmcs: Arc<MemoryStore<BMC>>,
    pub bmc_secrets: Arc<MemoryStore<BMCSecret>>,
    pub ip_pools: Arc<MemoryStore<GlobalInClusterIPPool>>,
    pub ip_address_claims: Arc<MemoryStore<IPAddressClaim>>,
    pub server_claims: Arc<MemoryStore<ServerClaim>>,
    pub servers: Arc<MemoryStore<Server>>,
    pub updates: Arc<MemoryStore<Update>>,
    pub cluster_imports: Arc<MemoryStore<ClusterImport>>,
    pub ip_pool_imports: Arc<MemoryStore<IPPoolImport>>,
}

pub fn create_test_harness() -> TestHarness {
    let netbox = MockNetBoxClient::new("http://netbox.mock");
    let config = Arc::new(StaticConfigSource::new(create_test_config()));
    let bmcs = Arc::new(MemoryStore::new());
    let bmc_secrets = Arc::new(MemoryStore::new());
    let ip_pools = Arc::new(MemoryStore::new());
    let ip_address_claims = Arc::new(MemoryStore::new());
    let server_claims = Arc::new(MemoryStore::new());
    let servers = Arc::new(MemoryStore::new());
    let updates = Arc::new(MemoryStore::new());
    let cluster_imports = Arc::new(MemoryStore::new());
    let ip_pool_imports = Arc::new(MemoryStore::new());

    let stores = Stores {
        bmcs: bmcs.clone(),
        bmc_secrets: bmc_secrets.clone(),
        ip_pools: ip_pools.clone(),
        ip_address_claims: ip_address_claims.clone(),
        server_claims: server_claims.clone(),
        servers: servers.clone(),
        updates: updates.clone(),
        cluster_imports: cluster_imports.clone(),
        ip_pool_imports: ip_pool_imports.clone(),
    };
    let reconciler = Reconciler::new(
        config.clone(),
        Arc::new(netbox.clone()),
        stores,
        fast_backoff(),
        Duration::from_secs(300),
    );

    TestHarness {
        reconciler,
        netbox,
        config,
        bmcs,
        bmc_secrets,
        ip_pools,
        ip_address_claims,
        server_claims,
        servers,
        updates,
        cluster_imports,
        ip_pool_imports,
    }
}

fn namespaced_meta(name: &str, namespace: &str) -> ObjectMeta {
    ObjectMeta {
        name: Some(name.to_string()),
        namespace: Some(namespace.to_string()),
        generation: Some(1),
        ..Default::default()
    }
}

pub fn create_test_cluster_selector(name: &str, region: &str, cluster_type: &str) -> ClusterSelector {
    ClusterSelector {
        name: name.to_string(),
        region: region.to_string(),
        cluster_type: cluster_type.to_string(),
    }
}

pub fn create_test_ip_pool_selector(name_prefix: &str, region: &str, role: &str) -> IPPoolSelector {
    IPPoolSelector {
        name_prefix: Some(name_prefix.to_string()),
        region: region.to_string(),
        role: role.to_string(),
        ..Default::default()
    }
}

/// Helper to create test Update CRD
pub fn create_test_update(name: &str, namespace: &str, clusters: Vec<ClusterSelector>) -> Update {
    Update {
        metadata: namespaced_meta(name, namespace),
        spec: UpdateSpec { clusters },
        status: None,
    }
}

/// Helper to create test ClusterImport CRD
pub fn create_test_cluster_import(name: &str, namespace: &str, clusters: Vec<ClusterSelector>) -> ClusterImport {
    ClusterImport {
        metadata: namespaced_meta(name, namespace),
        spec: ClusterImportSpec { clusters },
        status: None,
    }
}

/// Helper to create test IPPoolImport CRD
pub fn create_test_ip_pool_import(name: &str, namespace: &str, ip_pools: Vec<IPPoolSelector>) -> IPPoolImport {
    IPPoolImport {
        metadata: namespaced_meta(name, namespace),
        spec: IPPoolImportSpec { ip_pools },
        status: None,
    }
}

pub fn create_test_ip_address(name: &str, namespace: &str, claim: &str, address: &str, prefix: Option<u8>) -> IPAddress {
    IPAddress {
        metadata: namespaced_meta(name, namespace),
        spec: IPAddressSpec {
            claim_ref: LocalObjectReference::new(claim),
            pool_ref: TypedLocalObjectReference::new(IPAM_GROUP, "GlobalInClusterIPPool", "pool"),
            address: address.to_string(),
            prefix,
            gateway: None,
        },
    }
}

/// IPAddressClaim, controlled by the ServerClaim `owner` if given
pub fn create_test_ip_address_claim(name: &str, namespace: &str, owner: Option<&str>) -> IPAddressClaim {
    let mut meta = namespaced_meta(name, namespace);
    meta.owner_references = owner.map(|owner| {
        vec![OwnerReference {
            api_version: format!("{}/{}", METAL_GROUP, METAL_VERSION),
            kind: "ServerClaim".to_string(),
            name: owner.to_string(),
            uid: format!("uid-{}", owner),
            controller: Some(true),
            ..Default::default()
        }]
    });
    IPAddressClaim {
        metadata: meta,
        spec: IPAddressClaimSpec {
            pool_ref: TypedLocalObjectReference::new(IPAM_GROUP, "GlobalInClusterIPPool", "pool"),
        },
        status: None,
    }
}

pub fn create_test_server_claim(name: &str, namespace: &str, server: Option<&str>) -> ServerClaim {
    ServerClaim {
        metadata: namespaced_meta(name, namespace),
        spec: ServerClaimSpec {
            server_ref: server.map(LocalObjectReference::new),
            ..Default::default()
        },
    }
}

pub fn create_test_server(name: &str, bmc: Option<&str>) -> Server {
    Server {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            ..Default::default()
        },
        spec: ServerSpec {
            system_uuid: None,
            bmc_ref: bmc.map(LocalObjectReference::new),
        },
    }
}

/// BMC object referencing a BMCSecret of the same name
pub fn create_test_bmc(name: &str, labels: &[(&str, &str)]) -> BMC {
    let mut bmc = BMC::new(
        name,
        BMCSpec {
            endpoint: Some(InlineEndpoint {
                mac_address: None,
                ip: "10.0.0.1".to_string(),
            }),
            bmc_secret_ref: LocalObjectReference::new(name),
            protocol: Protocol::redfish(),
            ..Default::default()
        },
    );
    if !labels.is_empty() {
        bmc.metadata.labels = Some(
            labels
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect(),
        );
    }
    bmc
}

pub fn create_test_bmc_secret(name: &str, labels: &[(&str, &str)]) -> BMCSecret {
    let mut secret = BMCSecret::new(name, "admin", "hunter2");
    if !labels.is_empty() {
        secret.metadata.labels = Some(
            labels
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect(),
        );
    }
    secret
}
