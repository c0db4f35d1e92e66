//! Mock NetBox inventory for unit testing
//!
//! This module provides an in-memory implementation of the capability
//! traits and of [`NetBoxConnector`] that can be used in unit tests
//! without requiring a running NetBox instance.
//!
//! The mock is organized into API-group modules:
//! - `virtualization.rs` - clusters
//! - `dcim.rs` - devices, sites, interfaces
//! - `ipam.rs` - IP addresses and prefixes
//! - `helpers.rs` - fixture builders
//!
//! Clones share state, so a test keeps one handle for setup and
//! assertions while the code under test connects through another.

pub mod helpers;
mod dcim;
mod ipam;
mod virtualization;

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::error::NetBoxError;
use crate::models::*;
use crate::netbox_trait::{Dcim, Extras, Ipam, NetBox, NetBoxConnector, Virtualization};
use helpers::lock;

/// Mock NetBox client for testing
#[derive(Debug, Clone, Default)]
pub struct MockNetBoxClient {
    pub(crate) base_url: String,
    // In-memory storage, kept in insertion order like NetBox list results
    pub(crate) clusters: Arc<Mutex<Vec<(Cluster, String)>>>,
    pub(crate) devices: Arc<Mutex<Vec<Device>>>,
    pub(crate) sites: Arc<Mutex<HashMap<u64, Site>>>,
    pub(crate) interfaces: Arc<Mutex<Vec<Interface>>>,
    pub(crate) ip_addresses: Arc<Mutex<Vec<IPAddress>>>,
    pub(crate) prefixes: Arc<Mutex<Vec<(Prefix, String)>>>,
    pub(crate) tags: Arc<Mutex<Vec<NestedTag>>>,
    // Recorded writes
    pub(crate) device_updates: Arc<Mutex<Vec<(u64, UpdateDeviceRequest)>>>,
    pub(crate) created_ip_addresses: Arc<Mutex<Vec<CreateIPAddressRequest>>>,
    pub(crate) connections: Arc<Mutex<Vec<(String, String)>>>,
    // Operation name -> error message returned by that operation
    pub(crate) failures: Arc<Mutex<HashMap<String, String>>>,
    pub(crate) next_id: Arc<Mutex<u64>>,
}

impl MockNetBoxClient {
    /// Create a new mock client
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            next_id: Arc::new(Mutex::new(10_000)),
            ..Default::default()
        }
    }

    /// Get helpers instance
    pub fn helpers(&self) -> helpers::Helpers {
        helpers::Helpers::new(self.base_url.clone())
    }

    /// Add a cluster located in `region` (for test setup)
    pub fn add_cluster(&self, cluster: Cluster, region: &str) {
        lock(&self.clusters).push((cluster, region.to_string()));
    }

    /// Add a device to the mock store (for test setup)
    pub fn add_device(&self, device: Device) {
        lock(&self.devices).push(device);
    }

    /// Add a site to the mock store (for test setup)
    pub fn add_site(&self, site: Site) {
        lock(&self.sites).insert(site.id, site);
    }

    /// Add an interface to the mock store (for test setup)
    pub fn add_interface(&self, interface: Interface) {
        lock(&self.interfaces).push(interface);
    }

    /// Add an IP address to the mock store (for test setup)
    pub fn add_ip_address(&self, ip: IPAddress) {
        lock(&self.ip_addresses).push(ip);
    }

    /// Add a prefix located in `region` (for test setup)
    pub fn add_prefix(&self, prefix: Prefix, region: &str) {
        lock(&self.prefixes).push((prefix, region.to_string()));
    }

    /// Add a tag to the mock store (for test setup)
    pub fn add_tag(&self, tag: NestedTag) {
        lock(&self.tags).push(tag);
    }

    /// Make `operation` (a trait method name) fail with `message`
    pub fn fail_on(&self, operation: &str, message: &str) {
        lock(&self.failures).insert(operation.to_string(), message.to_string());
    }

    /// Device updates issued so far
    pub fn device_updates(&self) -> Vec<(u64, UpdateDeviceRequest)> {
        lock(&self.device_updates).clone()
    }

    /// IP address creations issued so far
    pub fn created_ip_addresses(&self) -> Vec<CreateIPAddressRequest> {
        lock(&self.created_ip_addresses).clone()
    }

    /// `(url, token)` of every connect call
    pub fn connections(&self) -> Vec<(String, String)> {
        lock(&self.connections).clone()
    }

    /// Current state of a device
    pub fn device(&self, id: u64) -> Option<Device> {
        lock(&self.devices).iter().find(|d| d.id == id).cloned()
    }

    pub(crate) fn injected_failure(&self, operation: &str) -> Result<(), NetBoxError> {
        match lock(&self.failures).get(operation) {
            Some(message) => Err(NetBoxError::Api(message.clone())),
            None => Ok(()),
        }
    }

    /// Generate next ID
    pub(crate) fn next_id(&self) -> u64 {
        let mut id = lock(&self.next_id);
        let current = *id;
        *id += 1;
        current
    }
}

#[async_trait::async_trait]
impl Virtualization for MockNetBoxClient {
    async fn get_clusters_by_name_region_type(
        &self,
        name: &str,
        region: &str,
        cluster_type: &str,
    ) -> Result<Vec<Cluster>, NetBoxError> {
        virtualization::get_clusters_by_name_region_type(self, name, region, cluster_type)
    }
}

#[async_trait::async_trait]
impl Dcim for MockNetBoxClient {
    async fn get_devices_by_cluster_id(&self, cluster_id: u64) -> Result<Vec<Device>, NetBoxError> {
        dcim::get_devices_by_cluster_id(self, cluster_id)
    }

    async fn get_region_for_device(&self, device: &Device) -> Result<String, NetBoxError> {
        dcim::get_region_for_device(self, device)
    }

    async fn get_device_by_name(&self, name: &str) -> Result<Device, NetBoxError> {
        dcim::get_device_by_name(self, name)
    }

    async fn get_interfaces_for_device(&self, device: &Device) -> Result<Vec<Interface>, NetBoxError> {
        dcim::get_interfaces_for_device(self, device)
    }

    async fn update_device(&self, id: u64, request: &UpdateDeviceRequest) -> Result<Device, NetBoxError> {
        dcim::update_device(self, id, request)
    }
}

#[async_trait::async_trait]
impl Ipam for MockNetBoxClient {
    async fn get_ip_address_by_address(&self, address: &str) -> Result<Option<IPAddress>, NetBoxError> {
        ipam::get_ip_address_by_address(self, address)
    }

    async fn create_ip_address(&self, request: &CreateIPAddressRequest) -> Result<IPAddress, NetBoxError> {
        ipam::create_ip_address(self, request)
    }

    async fn get_prefixes_by_prefix(&self, prefix: &str) -> Result<Vec<Prefix>, NetBoxError> {
        ipam::get_prefixes_by_prefix(self, prefix)
    }

    async fn get_prefixes_by_region_role(&self, region: &str, role: &str) -> Result<Vec<Prefix>, NetBoxError> {
        ipam::get_prefixes_by_region_role(self, region, role)
    }
}

#[async_trait::async_trait]
impl Extras for MockNetBoxClient {
    async fn get_tags(&self) -> Result<Vec<NestedTag>, NetBoxError> {
        self.injected_failure("get_tags")?;
        Ok(lock(&self.tags).clone())
    }
}

impl NetBox for MockNetBoxClient {
    fn base_url(&self) -> &str {
        &self.base_url
    }
}

impl NetBoxConnector for MockNetBoxClient {
    fn connect(&self, url: &str, token: &str) -> Result<Arc<dyn NetBox>, NetBoxError> {
        lock(&self.connections).push((url.to_string(), token.to_string()));
        self.injected_failure("connect")?;
        Ok(Arc::new(self.clone()))
    }
}
