//! Helper functions for creating NetBox model fixtures

use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::models::*;

/// Lock a mock table, ignoring poisoning from a panicked test thread
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Builds model fixtures whose URLs point at the mock's base URL
#[derive(Debug, Clone)]
pub struct Helpers {
    base_url: String,
}

impl Helpers {
    pub fn new(base_url: String) -> Self {
        Self { base_url }
    }

    fn create_nested(&self, path: &str, id: u64, slug: &str) -> NestedSlugged {
        NestedSlugged {
            url: format!("{}/api/{}/{}/", self.base_url, path, id),
            ..NestedSlugged::new(id, slug)
        }
    }

    pub fn create_nested_site(&self, id: u64, slug: &str) -> NestedSite {
        self.create_nested("dcim/sites", id, slug)
    }

    pub fn create_nested_region(&self, id: u64, slug: &str) -> NestedRegion {
        self.create_nested("dcim/regions", id, slug)
    }

    pub fn create_nested_role(&self, id: u64, slug: &str) -> NestedRole {
        self.create_nested("ipam/roles", id, slug)
    }

    /// Site `slug` inside region `region`
    pub fn create_site(&self, id: u64, slug: &str, region: Option<&str>) -> Site {
        Site {
            id,
            url: format!("{}/api/dcim/sites/{}/", self.base_url, id),
            display: slug.to_string(),
            name: slug.to_string(),
            slug: slug.to_string(),
            region: region.map(|r| self.create_nested_region(id + 1000, r)),
        }
    }

    pub fn create_cluster(&self, id: u64, name: &str, cluster_type: &str) -> Cluster {
        Cluster {
            id,
            url: format!("{}/api/virtualization/clusters/{}/", self.base_url, id),
            display: name.to_string(),
            name: name.to_string(),
            cluster_type: self.create_nested("virtualization/cluster-types", id, cluster_type),
            tags: Vec::new(),
        }
    }

    /// An active server at `site` with an OOB address of 10.0.0.<id>/24
    pub fn create_device(&self, id: u64, name: &str, site: &NestedSite) -> Device {
        Device {
            id,
            url: format!("{}/api/dcim/devices/{}/", self.base_url, id),
            display: name.to_string(),
            name: Some(name.to_string()),
            device_type: NestedDeviceType {
                id: 1,
                url: format!("{}/api/dcim/device-types/1/", self.base_url),
                display: "PowerEdge R640".to_string(),
                model: "PowerEdge R640".to_string(),
                slug: "poweredge-r640".to_string(),
            },
            role: self.create_nested("dcim/device-roles", 1, "server"),
            platform: Some(self.create_nested("dcim/platforms", 1, "linux-kvm")),
            site: site.clone(),
            cluster: None,
            status: ChoiceField::new(DEVICE_STATUS_ACTIVE),
            primary_ip4: None,
            oob_ip: Some(NestedIPAddress {
                id: id + 5000,
                url: String::new(),
                display: format!("10.0.0.{}/24", id % 250),
                address: format!("10.0.0.{}/24", id % 250),
            }),
            tags: Vec::new(),
        }
    }

    pub fn create_interface(&self, id: u64, device: &Device, name: &str, interface_type: &str) -> Interface {
        Interface {
            id,
            url: format!("{}/api/dcim/interfaces/{}/", self.base_url, id),
            display: name.to_string(),
            device: NestedDevice {
                id: device.id,
                url: device.url.clone(),
                display: device.display.clone(),
                name: device.name.clone(),
            },
            name: name.to_string(),
            interface_type: ChoiceField::new(interface_type),
        }
    }

    /// An IP address bound to `interface`
    pub fn create_ip_address(&self, id: u64, address: &str, interface: Option<&Interface>) -> IPAddress {
        IPAddress {
            id,
            url: format!("{}/api/ipam/ip-addresses/{}/", self.base_url, id),
            display: address.to_string(),
            address: address.to_string(),
            vrf: None,
            status: ChoiceField::new("active"),
            assigned_object_type: interface.map(|_| ASSIGNED_OBJECT_TYPE_INTERFACE.to_string()),
            assigned_object_id: interface.map(|i| i.id),
            assigned_object: interface.map(|i| AssignedInterface {
                id: i.id,
                url: i.url.clone(),
                display: i.display.clone(),
                name: i.name.clone(),
                device: Some(i.device.clone()),
            }),
        }
    }

    pub fn create_prefix(&self, id: u64, prefix: &str, site: Option<&str>, role: &str) -> Prefix {
        Prefix {
            id,
            url: format!("{}/api/ipam/prefixes/{}/", self.base_url, id),
            display: prefix.to_string(),
            prefix: prefix.to_string(),
            vrf: None,
            site: site.map(|s| self.create_nested_site(id + 2000, s)),
            role: Some(self.create_nested_role(id + 3000, role)),
            vlan: None,
            status: ChoiceField::new("active"),
        }
    }
}
