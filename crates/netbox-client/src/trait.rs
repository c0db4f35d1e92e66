//! NetBox capability traits
//!
//! The inventory is split into one trait per NetBox API group, composed
//! into [`NetBox`]. Engines depend on the composite; tests substitute
//! `MockNetBoxClient`. All async methods must be `Send` to work with
//! Tokio's work-stealing runtime.

use std::sync::Arc;

use crate::error::NetBoxError;
use crate::models::*;

/// `/api/virtualization/` operations
#[async_trait::async_trait]
pub trait Virtualization: Send + Sync {
    /// Clusters matching all non-empty filters; empty strings are wildcards
    async fn get_clusters_by_name_region_type(
        &self,
        name: &str,
        region: &str,
        cluster_type: &str,
    ) -> Result<Vec<Cluster>, NetBoxError>;
}

/// `/api/dcim/` operations
#[async_trait::async_trait]
pub trait Dcim: Send + Sync {
    /// Devices of a cluster, in NetBox order
    async fn get_devices_by_cluster_id(&self, cluster_id: u64) -> Result<Vec<Device>, NetBoxError>;

    /// Region slug of the device's site
    async fn get_region_for_device(&self, device: &Device) -> Result<String, NetBoxError>;

    /// The single device with this name
    async fn get_device_by_name(&self, name: &str) -> Result<Device, NetBoxError>;

    async fn get_interfaces_for_device(&self, device: &Device) -> Result<Vec<Interface>, NetBoxError>;

    async fn update_device(&self, id: u64, request: &UpdateDeviceRequest) -> Result<Device, NetBoxError>;
}

/// `/api/ipam/` operations
#[async_trait::async_trait]
pub trait Ipam: Send + Sync {
    /// The IP address record for `address` ("a.b.c.d/len"), if any
    async fn get_ip_address_by_address(&self, address: &str) -> Result<Option<IPAddress>, NetBoxError>;

    async fn create_ip_address(&self, request: &CreateIPAddressRequest) -> Result<IPAddress, NetBoxError>;

    /// Prefixes equal to `prefix`, across VRFs
    async fn get_prefixes_by_prefix(&self, prefix: &str) -> Result<Vec<Prefix>, NetBoxError>;

    async fn get_prefixes_by_region_role(&self, region: &str, role: &str) -> Result<Vec<Prefix>, NetBoxError>;
}

/// `/api/extras/` operations
///
/// No reconciler needs extras data yet; the group exists so the composite
/// covers every API group the operator is allowed to talk to.
#[async_trait::async_trait]
pub trait Extras: Send + Sync {
    /// Tags attached to any object, by slug
    async fn get_tags(&self) -> Result<Vec<NestedTag>, NetBoxError>;
}

/// A connected NetBox inventory
pub trait NetBox: Virtualization + Dcim + Ipam + Extras {
    fn base_url(&self) -> &str;
}

/// Builds a fresh [`NetBox`] connection.
///
/// Reconcilers reconnect at the start of every pass so URL or token
/// rotations take effect without a restart.
pub trait NetBoxConnector: Send + Sync {
    fn connect(&self, url: &str, token: &str) -> Result<Arc<dyn NetBox>, NetBoxError>;
}
