//! IPAM operations for MockNetBoxClient
//!
//! Handles IP addresses and prefixes

use super::helpers::lock;
use super::MockNetBoxClient;
use crate::error::NetBoxError;
use crate::models::*;

pub fn get_ip_address_by_address(client: &MockNetBoxClient, address: &str) -> Result<Option<IPAddress>, NetBoxError> {
    client.injected_failure("get_ip_address_by_address")?;
    let addresses = lock(&client.ip_addresses);
    let mut matching = addresses.iter().filter(|ip| ip.address == address);
    let first = matching.next().cloned();
    let rest = matching.count();
    if rest > 0 {
        return Err(NetBoxError::MultipleResults {
            kind: "ip addresses",
            query: address.to_string(),
            count: rest + 1,
        });
    }
    Ok(first)
}

pub fn create_ip_address(client: &MockNetBoxClient, request: &CreateIPAddressRequest) -> Result<IPAddress, NetBoxError> {
    client.injected_failure("create_ip_address")?;
    lock(&client.created_ip_addresses).push(request.clone());

    let assigned_object = match (request.assigned_object_type.as_deref(), request.assigned_object_id) {
        (Some(ASSIGNED_OBJECT_TYPE_INTERFACE), Some(interface_id)) => lock(&client.interfaces)
            .iter()
            .find(|i| i.id == interface_id)
            .map(|i| AssignedInterface {
                id: i.id,
                url: i.url.clone(),
                display: i.display.clone(),
                name: i.name.clone(),
                device: Some(i.device.clone()),
            }),
        _ => None,
    };

    let id = client.next_id();
    let ip = IPAddress {
        id,
        url: format!("{}/api/ipam/ip-addresses/{}/", client.base_url, id),
        display: request.address.clone(),
        address: request.address.clone(),
        vrf: request.vrf.map(|vrf| NestedVrf {
            id: vrf,
            ..Default::default()
        }),
        status: ChoiceField::new(request.status.as_deref().unwrap_or("active")),
        assigned_object_type: request.assigned_object_type.clone(),
        assigned_object_id: request.assigned_object_id,
        assigned_object,
    };
    lock(&client.ip_addresses).push(ip.clone());
    Ok(ip)
}

pub fn get_prefixes_by_prefix(client: &MockNetBoxClient, prefix: &str) -> Result<Vec<Prefix>, NetBoxError> {
    client.injected_failure("get_prefixes_by_prefix")?;
    Ok(lock(&client.prefixes)
        .iter()
        .filter(|(p, _)| p.prefix == prefix)
        .map(|(p, _)| p.clone())
        .collect())
}

pub fn get_prefixes_by_region_role(client: &MockNetBoxClient, region: &str, role: &str) -> Result<Vec<Prefix>, NetBoxError> {
    client.injected_failure("get_prefixes_by_region_role")?;
    Ok(lock(&client.prefixes)
        .iter()
        .filter(|(p, prefix_region)| {
            (region.is_empty() || prefix_region == region)
                && (role.is_empty() || p.role.as_ref().is_some_and(|r| r.slug == role))
        })
        .map(|(p, _)| p.clone())
        .collect())
}
