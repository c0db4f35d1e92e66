//! NetBox API models
//!
//! These models match the subset of the NetBox REST API serializers the
//! operator consumes. Fields NetBox returns beyond these are ignored.
//! See: netbox/netbox/{dcim,ipam,virtualization}/api/serializers_/

use serde::{Deserialize, Serialize};

/// Value/label pair used by NetBox for choice fields (`status`, `type`, ...)
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChoiceField {
    pub value: String,
    #[serde(default)]
    pub label: String,
}

impl ChoiceField {
    pub fn new(value: &str) -> Self {
        Self {
            value: value.to_string(),
            label: value.to_string(),
        }
    }
}

/// Device status value of devices the operator imports
pub const DEVICE_STATUS_ACTIVE: &str = "active";

/// Interface type value of link aggregation groups
pub const INTERFACE_TYPE_LAG: &str = "lag";

/// Assigned object type of interface-bound IP addresses
pub const ASSIGNED_OBJECT_TYPE_INTERFACE: &str = "dcim.interface";

// ---------------------------------------------------------------------------
// Nested (brief) representations
// ---------------------------------------------------------------------------

/// Brief representation of any slugged object (region, site, role, platform, ...)
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct NestedSlugged {
    pub id: u64,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub display: String,
    #[serde(default)]
    pub name: String,
    pub slug: String,
}

impl NestedSlugged {
    pub fn new(id: u64, slug: &str) -> Self {
        Self {
            id,
            url: String::new(),
            display: slug.to_string(),
            name: slug.to_string(),
            slug: slug.to_string(),
        }
    }
}

pub type NestedRegion = NestedSlugged;
pub type NestedSite = NestedSlugged;
pub type NestedRole = NestedSlugged;
pub type NestedPlatform = NestedSlugged;
pub type NestedClusterType = NestedSlugged;
pub type NestedTag = NestedSlugged;

/// Brief device type (model + slug)
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct NestedDeviceType {
    pub id: u64,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub display: String,
    #[serde(default)]
    pub model: String,
    pub slug: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct NestedDevice {
    pub id: u64,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub display: String,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct NestedCluster {
    pub id: u64,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub display: String,
    pub name: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct NestedIPAddress {
    pub id: u64,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub display: String,
    pub address: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct NestedVrf {
    pub id: u64,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub display: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct NestedVlan {
    pub id: u64,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub display: String,
    #[serde(default)]
    pub vid: u16,
    pub name: String,
}

/// Interface an IP address is assigned to, with its parent device
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct AssignedInterface {
    pub id: u64,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub display: String,
    #[serde(default)]
    pub name: String,
    /// Set for `dcim.interface`, absent for VM interfaces
    #[serde(default)]
    pub device: Option<NestedDevice>,
}

// ---------------------------------------------------------------------------
// Virtualization
// ---------------------------------------------------------------------------

/// Cluster model matching NetBox ClusterSerializer
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Cluster {
    pub id: u64,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub display: String,
    pub name: String,
    #[serde(rename = "type")]
    pub cluster_type: NestedClusterType,
    #[serde(default)]
    pub tags: Vec<NestedTag>,
}

// ---------------------------------------------------------------------------
// DCIM
// ---------------------------------------------------------------------------

/// Device model matching NetBox DeviceSerializer
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Device {
    pub id: u64,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub display: String,
    /// NetBox allows unnamed devices
    #[serde(default)]
    pub name: Option<String>,
    pub device_type: NestedDeviceType,
    /// `device_role` before NetBox 4.0
    #[serde(alias = "device_role")]
    pub role: NestedRole,
    #[serde(default)]
    pub platform: Option<NestedPlatform>,
    pub site: NestedSite,
    #[serde(default)]
    pub cluster: Option<NestedCluster>,
    pub status: ChoiceField,
    #[serde(default)]
    pub primary_ip4: Option<NestedIPAddress>,
    #[serde(default)]
    pub oob_ip: Option<NestedIPAddress>,
    #[serde(default)]
    pub tags: Vec<NestedTag>,
}

impl Device {
    /// Device name, empty for unnamed devices
    pub fn name(&self) -> &str {
        self.name.as_deref().unwrap_or_default()
    }

    pub fn is_active(&self) -> bool {
        self.status.value == DEVICE_STATUS_ACTIVE
    }
}

/// Site model matching NetBox SiteSerializer
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Site {
    pub id: u64,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub display: String,
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub region: Option<NestedRegion>,
}

/// Interface model matching NetBox InterfaceSerializer
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Interface {
    pub id: u64,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub display: String,
    pub device: NestedDevice,
    pub name: String,
    #[serde(rename = "type")]
    pub interface_type: ChoiceField,
}

/// Writable fields of a device update (PATCH /api/dcim/devices/{id}/)
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct UpdateDeviceRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub primary_ip4: Option<u64>,
}

// ---------------------------------------------------------------------------
// IPAM
// ---------------------------------------------------------------------------

/// IP Address model matching NetBox IPAddressSerializer
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct IPAddress {
    pub id: u64,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub display: String,
    /// Address with prefix length, e.g. "10.0.0.5/32"
    pub address: String,
    #[serde(default)]
    pub vrf: Option<NestedVrf>,
    #[serde(default)]
    pub status: ChoiceField,
    #[serde(default)]
    pub assigned_object_type: Option<String>,
    #[serde(default)]
    pub assigned_object_id: Option<u64>,
    #[serde(default)]
    pub assigned_object: Option<AssignedInterface>,
}

impl IPAddress {
    /// ID of the device owning the assigned interface, if any
    pub fn assigned_device_id(&self) -> Option<u64> {
        self.assigned_object
            .as_ref()
            .and_then(|o| o.device.as_ref())
            .map(|d| d.id)
    }
}

/// Writable fields of an IP address (POST /api/ipam/ip-addresses/)
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CreateIPAddressRequest {
    pub address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vrf: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_object_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_object_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Prefix model matching NetBox PrefixSerializer
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Prefix {
    pub id: u64,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub display: String,
    /// CIDR, e.g. "10.10.10.0/24"
    pub prefix: String,
    #[serde(default)]
    pub vrf: Option<NestedVrf>,
    /// `site` before NetBox 4.2, the (site) scope afterwards
    #[serde(default, alias = "scope")]
    pub site: Option<NestedSite>,
    #[serde(default)]
    pub role: Option<NestedRole>,
    #[serde(default)]
    pub vlan: Option<NestedVlan>,
    #[serde(default)]
    pub status: ChoiceField,
}
