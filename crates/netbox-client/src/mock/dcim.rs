//! DCIM operations for MockNetBoxClient
//!
//! Handles devices, sites and interfaces

use super::helpers::lock;
use super::MockNetBoxClient;
use crate::error::NetBoxError;
use crate::models::*;

pub fn get_devices_by_cluster_id(client: &MockNetBoxClient, cluster_id: u64) -> Result<Vec<Device>, NetBoxError> {
    client.injected_failure("get_devices_by_cluster_id")?;
    Ok(lock(&client.devices)
        .iter()
        .filter(|d| d.cluster.as_ref().is_some_and(|c| c.id == cluster_id))
        .cloned()
        .collect())
}

pub fn get_region_for_device(client: &MockNetBoxClient, device: &Device) -> Result<String, NetBoxError> {
    client.injected_failure("get_region_for_device")?;
    let sites = lock(&client.sites);
    let site = sites
        .get(&device.site.id)
        .ok_or_else(|| NetBoxError::NotFound(format!("site {}", device.site.id)))?;
    site.region
        .as_ref()
        .map(|r| r.slug.clone())
        .ok_or_else(|| NetBoxError::NotFound(format!("region for site {} of device {}", site.slug, device.name())))
}

pub fn get_device_by_name(client: &MockNetBoxClient, name: &str) -> Result<Device, NetBoxError> {
    client.injected_failure("get_device_by_name")?;
    let mut devices: Vec<Device> = lock(&client.devices)
        .iter()
        .filter(|d| d.name() == name)
        .cloned()
        .collect();
    match devices.len() {
        0 => Err(NetBoxError::NotFound(format!("devices {}", name))),
        1 => Ok(devices.remove(0)),
        count => Err(NetBoxError::MultipleResults {
            kind: "devices",
            query: name.to_string(),
            count,
        }),
    }
}

pub fn get_interfaces_for_device(client: &MockNetBoxClient, device: &Device) -> Result<Vec<Interface>, NetBoxError> {
    client.injected_failure("get_interfaces_for_device")?;
    Ok(lock(&client.interfaces)
        .iter()
        .filter(|i| i.device.id == device.id)
        .cloned()
        .collect())
}

pub fn update_device(client: &MockNetBoxClient, id: u64, request: &UpdateDeviceRequest) -> Result<Device, NetBoxError> {
    client.injected_failure("update_device")?;
    lock(&client.device_updates).push((id, request.clone()));

    let primary = match request.primary_ip4 {
        Some(ip_id) => {
            let addresses = lock(&client.ip_addresses);
            let ip = addresses
                .iter()
                .find(|ip| ip.id == ip_id)
                .ok_or_else(|| NetBoxError::InvalidRequest(format!("IP address {} not found", ip_id)))?;
            Some(NestedIPAddress {
                id: ip.id,
                url: ip.url.clone(),
                display: ip.display.clone(),
                address: ip.address.clone(),
            })
        }
        None => None,
    };

    let mut devices = lock(&client.devices);
    let device = devices
        .iter_mut()
        .find(|d| d.id == id)
        .ok_or_else(|| NetBoxError::NotFound(format!("device {}", id)))?;
    if primary.is_some() {
        device.primary_ip4 = primary;
    }
    Ok(device.clone())
}
