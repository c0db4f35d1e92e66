//! IP address reconciler
//!
//! Writes an allocated `IPAddress` back to NetBox. The target device is
//! found through the ownership chain
//! `IPAddress -> IPAddressClaim -> ServerClaim -> Server -> BMC`, whose
//! name is the NetBox device name. The address is bound to the device's
//! LAG interface and made its primary IPv4 address.

use std::net::IpAddr;

use crds::IPAddress;
use kube::ResourceExt;
use kube_runtime::controller::Action;
use netbox_client::{
    CreateIPAddressRequest, Device, IPAddress as NetBoxIPAddress, Interface, NetBox, UpdateDeviceRequest,
    ASSIGNED_OBJECT_TYPE_INTERFACE, INTERFACE_TYPE_LAG,
};
use tracing::{debug, error, info, warn};

use super::Reconciler;
use crate::error::{ControllerError, ErrorContext};
use crate::network::Cidr;

const SERVER_CLAIM_KIND: &str = "ServerClaim";

/// The LAG interface with the highest `LAG<digit>` name
pub fn select_lag_interface(interfaces: &[Interface]) -> Option<&Interface> {
    interfaces
        .iter()
        .filter(|i| i.interface_type.value.eq_ignore_ascii_case(INTERFACE_TYPE_LAG))
        .filter_map(|i| lag_index(&i.name).map(|index| (index, i)))
        .max_by_key(|(index, _)| *index)
        .map(|(_, i)| i)
}

fn lag_index(name: &str) -> Option<u32> {
    let digit = name.strip_prefix("LAG")?;
    let mut chars = digit.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => c.to_digit(10),
        _ => None,
    }
}

/// `address/prefix` as looked up in NetBox. A missing or zero prefix means
/// a single host: /32 for IPv4, /128 for IPv6.
pub fn lookup_address(address: &str, prefix: Option<u8>) -> Result<Cidr, ControllerError> {
    let invalid = |reason: String| ControllerError::InvalidIpAddress {
        address: address.to_string(),
        reason,
    };
    let ip: IpAddr = address.trim().parse().map_err(|e| invalid(format!("{}", e)))?;
    let max_len = if ip.is_ipv4() { 32 } else { 128 };
    let prefix_len = match prefix {
        None | Some(0) => max_len,
        Some(len) => len,
    };
    Cidr::new(ip, prefix_len).map_err(invalid)
}

impl Reconciler {
    /// One pass over an `IPAddress`. Failures go back to the runtime; the
    /// resource has no status of its own.
    pub async fn reconcile_ip_address(&self, ip_address: &IPAddress) -> Result<Action, ControllerError> {
        let namespace = ip_address.namespace().unwrap_or_default();
        let name = ip_address.name_any();
        info!("Reconciling IPAddress {}/{}", namespace, name);

        match self.reconcile_ip_address_pass(ip_address).await {
            Ok(()) => {
                info!("Reconciled IPAddress {}/{}", namespace, name);
                Ok(Action::requeue(self.reconcile_interval))
            }
            Err(err) => {
                error!("Failed to reconcile IPAddress {}/{}: {}", namespace, name, err);
                Err(err)
            }
        }
    }

    async fn reconcile_ip_address_pass(&self, ip_address: &IPAddress) -> Result<(), ControllerError> {
        let (_, netbox) = self.connect()?;

        let device_name = self
            .resolve_device_name(ip_address)
            .await
            .context("unable to resolve device of ip address")?;
        let device = netbox.get_device_by_name(&device_name).await?;
        let interfaces = netbox.get_interfaces_for_device(&device).await?;
        let lag = select_lag_interface(&interfaces)
            .ok_or_else(|| ControllerError::NoLagInterface(device_name.clone()))?;

        let address = lookup_address(&ip_address.spec.address, ip_address.spec.prefix)?;
        let ip = self
            .ensure_ip_address(netbox.as_ref(), &device, lag, &address)
            .await?;
        self.ensure_primary_ip(netbox.as_ref(), &device, &ip, &address).await
    }

    /// Name of the BMC behind the server the address was claimed for
    pub(crate) async fn resolve_device_name(&self, ip_address: &IPAddress) -> Result<String, ControllerError> {
        let namespace = ip_address.namespace().ok_or(ControllerError::MissingField {
            kind: "IPAddress",
            field: "metadata.namespace",
        })?;

        let claim_name = &ip_address.spec.claim_ref.name;
        let claim = self
            .ip_address_claims
            .get(Some(&namespace), claim_name)
            .await?
            .ok_or_else(|| ControllerError::ClaimNotFound(claim_name.clone()))?;

        let owner = claim
            .owner_references()
            .iter()
            .find(|o| o.kind == SERVER_CLAIM_KIND)
            .ok_or_else(|| ControllerError::NoServerClaimOwner(claim_name.clone()))?;

        let server_claim = self
            .server_claims
            .get(Some(&namespace), &owner.name)
            .await?
            .ok_or_else(|| ControllerError::ServerClaimNotFound(owner.name.clone()))?;

        let server_name = server_claim
            .spec
            .server_ref
            .as_ref()
            .map(|r| r.name.clone())
            .filter(|n| !n.is_empty())
            .ok_or_else(|| ControllerError::ServerClaimUnbound(owner.name.clone()))?;

        let server = self
            .servers
            .get(None, &server_name)
            .await?
            .ok_or_else(|| ControllerError::ServerNotFound(server_name.clone()))?;

        let bmc_name = server
            .spec
            .bmc_ref
            .as_ref()
            .map(|r| r.name.clone())
            .filter(|n| !n.is_empty())
            .ok_or_else(|| ControllerError::ServerWithoutBmcRef(server_name.clone()))?;

        debug!(
            "IPAddress {} resolved via claim {}, server claim {}, server {} to device {}",
            ip_address.name_any(),
            claim_name,
            owner.name,
            server_name,
            bmc_name
        );
        Ok(bmc_name)
    }

    /// The NetBox address bound to `lag`, created if missing
    async fn ensure_ip_address(
        &self,
        netbox: &dyn NetBox,
        device: &Device,
        lag: &Interface,
        address: &Cidr,
    ) -> Result<NetBoxIPAddress, ControllerError> {
        let lookup = address.to_string();

        if let Some(existing) = netbox.get_ip_address_by_address(&lookup).await? {
            if existing.assigned_object_id != Some(lag.id) {
                return Err(ControllerError::IPAssignedToAnotherInterface {
                    address: lookup,
                    assigned: existing.assigned_object_id,
                    expected: lag.id,
                });
            }
            // Same interface id, but NetBox reports a different owning device
            let assigned_device = existing.assigned_device_id();
            if assigned_device.is_some_and(|id| id != device.id) {
                return Err(ControllerError::IPAssignedToAnotherDevice {
                    address: lookup,
                    assigned: assigned_device,
                    expected: device.id,
                });
            }
            debug!("IP address {} already assigned to {} of {}", lookup, lag.name, device.name());
            return Ok(existing);
        }

        let vrf = self.find_vrf(netbox, address).await;
        let request = CreateIPAddressRequest {
            address: lookup.clone(),
            status: Some("active".to_string()),
            vrf,
            assigned_object_type: Some(ASSIGNED_OBJECT_TYPE_INTERFACE.to_string()),
            assigned_object_id: Some(lag.id),
            ..Default::default()
        };
        let created = netbox.create_ip_address(&request).await?;
        info!(
            "Created IP address {} ({}) on {} of device {}",
            lookup,
            created.id,
            lag.name,
            device.name()
        );
        Ok(created)
    }

    /// VRF of the only prefix covering `address`, if there is exactly one
    async fn find_vrf(&self, netbox: &dyn NetBox, address: &Cidr) -> Option<u64> {
        let masked = address.masked(address.prefix_len()).unwrap_or(*address).to_string();
        match netbox.get_prefixes_by_prefix(&masked).await {
            Ok(prefixes) if prefixes.len() == 1 => prefixes[0].vrf.as_ref().map(|vrf| vrf.id),
            Ok(prefixes) => {
                warn!(
                    "Found {} prefixes for {}, creating IP address {} without VRF",
                    prefixes.len(),
                    masked,
                    address
                );
                None
            }
            Err(err) => {
                warn!(
                    "Unable to look up prefix {}, creating IP address {} without VRF: {}",
                    masked, address, err
                );
                None
            }
        }
    }

    async fn ensure_primary_ip(
        &self,
        netbox: &dyn NetBox,
        device: &Device,
        ip: &NetBoxIPAddress,
        address: &Cidr,
    ) -> Result<(), ControllerError> {
        if !address.address().is_ipv4() {
            debug!("Not setting IPv6 address {} as primary IPv4 of {}", address, device.name());
            return Ok(());
        }
        if device.primary_ip4.as_ref().map(|p| p.id) == Some(ip.id) {
            debug!("Primary IPv4 of {} is already {}", device.name(), address);
            return Ok(());
        }

        let request = UpdateDeviceRequest {
            primary_ip4: Some(ip.id),
        };
        netbox.update_device(device.id, &request).await?;
        info!("Set primary IPv4 of device {} to {}", device.name(), address);
        Ok(())
    }
}
