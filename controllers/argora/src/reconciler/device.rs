//! Device reconciler
//!
//! Each active NetBox device of a selected cluster becomes a `BMC` object
//! and a `BMCSecret` holding the BMC credentials, both named after the
//! device and carrying the same topology labels. Existing BMCs only get
//! their labels merged; objects are never deleted.

use std::collections::BTreeMap;

use crds::{BMCSpec, ClusterSelector, InlineEndpoint, LocalObjectReference, Protocol, BMCSecret, BMC};
use kube::{Resource, ResourceExt};
use netbox_client::{Cluster, Device, NetBox};
use tracing::{debug, info};

use super::selection::{select_clusters, SelectionMode};
use super::Reconciler;
use crate::config::Config;
use crate::error::{ControllerError, ErrorContext};
use crate::network::Cidr;

pub const LABEL_REGION: &str = "topology.kubernetes.io/region";
pub const LABEL_ZONE: &str = "topology.kubernetes.io/zone";
pub const LABEL_CLUSTER: &str = "kubernetes.metal.cloud.sap/cluster";
pub const LABEL_CLUSTER_TYPE: &str = "kubernetes.metal.cloud.sap/cluster-type";
pub const LABEL_NAME: &str = "kubernetes.metal.cloud.sap/name";
pub const LABEL_BB: &str = "kubernetes.metal.cloud.sap/bb";
pub const LABEL_TYPE: &str = "kubernetes.metal.cloud.sap/type";
pub const LABEL_ROLE: &str = "kubernetes.metal.cloud.sap/role";
pub const LABEL_PLATFORM: &str = "kubernetes.metal.cloud.sap/platform";

/// Split `node001-bb091` into `("node001", "bb091")`
pub fn split_device_name(name: &str) -> Result<(&str, &str), ControllerError> {
    let mut parts = name.split('-');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(node), Some(bb), None) => Ok((node, bb)),
        _ => Err(ControllerError::InvalidDeviceName(name.to_string())),
    }
}

/// Topology labels shared by the BMC and BMCSecret of a device
pub fn derive_labels(region: &str, cluster: &Cluster, device: &Device, bb: &str) -> BTreeMap<String, String> {
    let mut labels = BTreeMap::from([
        (LABEL_REGION.to_string(), region.to_string()),
        (LABEL_ZONE.to_string(), device.site.slug.clone()),
        (LABEL_CLUSTER.to_string(), cluster.name.clone()),
        (LABEL_CLUSTER_TYPE.to_string(), cluster.cluster_type.slug.clone()),
        (LABEL_NAME.to_string(), device.name().to_string()),
        (LABEL_BB.to_string(), bb.to_string()),
        (LABEL_TYPE.to_string(), device.device_type.slug.clone()),
        (LABEL_ROLE.to_string(), device.role.slug.clone()),
    ]);
    if let Some(platform) = &device.platform {
        labels.insert(LABEL_PLATFORM.to_string(), platform.slug.clone());
    }
    labels
}

/// Merge `derived` into `existing`. Derived values win, no key is removed.
/// Returns whether `existing` changed.
pub fn merge_labels(existing: &mut BTreeMap<String, String>, derived: &BTreeMap<String, String>) -> bool {
    let mut changed = false;
    for (key, value) in derived {
        if existing.get(key) != Some(value) {
            existing.insert(key.clone(), value.clone());
            changed = true;
        }
    }
    changed
}

/// Host part of the device's OOB address, e.g. `10.0.0.7` for `10.0.0.7/24`
pub fn oob_host_ip(device: &Device) -> Result<String, ControllerError> {
    let oob_ip = device
        .oob_ip
        .as_ref()
        .ok_or_else(|| ControllerError::MissingOobIp(device.name().to_string()))?;
    let cidr: Cidr = oob_ip
        .address
        .parse()
        .map_err(|reason| ControllerError::InvalidOobIp {
            address: oob_ip.address.clone(),
            reason,
        })?;
    Ok(cidr.address().to_string())
}

impl Reconciler {
    /// Reconcile the devices of every cluster matching `selectors`, in the
    /// order NetBox returns them, stopping at the first failure
    pub(crate) async fn reconcile_cluster_selectors(
        &self,
        netbox: &dyn NetBox,
        config: &Config,
        selectors: &[ClusterSelector],
        mode: SelectionMode,
    ) -> Result<(), ControllerError> {
        for selector in selectors {
            self.reconcile_cluster_selector(netbox, config, selector, mode)
                .await
                .context("unable to reconcile cluster")?;
        }
        Ok(())
    }

    async fn reconcile_cluster_selector(
        &self,
        netbox: &dyn NetBox,
        config: &Config,
        selector: &ClusterSelector,
        mode: SelectionMode,
    ) -> Result<(), ControllerError> {
        let clusters = select_clusters(netbox, selector, mode).await?;
        for cluster in &clusters {
            let devices = netbox.get_devices_by_cluster_id(cluster.id).await?;
            info!(
                "Reconciling {} device(s) of cluster {} ({})",
                devices.len(),
                cluster.name,
                cluster.id
            );
            for device in &devices {
                self.reconcile_device(netbox, config, cluster, device)
                    .await
                    .with_context(|| {
                        format!(
                            "unable to reconcile device {} ({}) on cluster {} ({})",
                            device.name(),
                            device.id,
                            cluster.name,
                            cluster.id
                        )
                    })?;
            }
        }
        Ok(())
    }

    /// Ensure the BMC and BMCSecret of one device
    pub(crate) async fn reconcile_device(
        &self,
        netbox: &dyn NetBox,
        config: &Config,
        cluster: &Cluster,
        device: &Device,
    ) -> Result<(), ControllerError> {
        let name = device.name();
        if !device.is_active() {
            debug!(
                "Skipping device {} ({}) with status {}",
                name, device.id, device.status.value
            );
            return Ok(());
        }
        let (_, bb) = split_device_name(name)?;

        if let Some(bmc) = self.bmcs.get(None, name).await? {
            let region = netbox
                .get_region_for_device(device)
                .await
                .context("unable to get region for device")?;
            let labels = derive_labels(&region, cluster, device, bb);
            return self.update_labels(bmc, &labels).await;
        }

        let region = netbox
            .get_region_for_device(device)
            .await
            .context("unable to get region for device")?;
        let oob_ip = oob_host_ip(device).context("unable to get OOB IP")?;
        let labels = derive_labels(&region, cluster, device, bb);

        self.create_bmc_secret(config, name, &labels)
            .await
            .context("unable to create bmc secret")?;
        self.create_bmc(name, &oob_ip, &labels)
            .await
            .context("unable to create bmc")?;
        self.set_bmc_secret_owner(name)
            .await
            .context("unable to set owner reference and patch bmc secret")?;

        info!("Imported device {} ({}) as BMC {}", name, device.id, oob_ip);
        Ok(())
    }

    async fn update_labels(&self, mut bmc: BMC, labels: &BTreeMap<String, String>) -> Result<(), ControllerError> {
        let name = bmc.name_any();
        if merge_labels(bmc.labels_mut(), labels) {
            self.bmcs.patch(&bmc).await?;
            info!("Updated labels of BMC {}", name);
        } else {
            debug!("Labels of BMC {} are up to date", name);
        }

        let secret_name = &bmc.spec.bmc_secret_ref.name;
        if secret_name.is_empty() {
            return Ok(());
        }
        match self.bmc_secrets.get(None, secret_name).await? {
            Some(mut secret) => {
                if merge_labels(secret.labels_mut(), labels) {
                    self.bmc_secrets.patch(&secret).await?;
                    info!("Updated labels of BMCSecret {}", secret_name);
                }
            }
            None => debug!("BMCSecret {} of BMC {} not found", secret_name, name),
        }
        Ok(())
    }

    async fn create_bmc_secret(
        &self,
        config: &Config,
        name: &str,
        labels: &BTreeMap<String, String>,
    ) -> Result<(), ControllerError> {
        if config.bmc_user.is_empty() || config.bmc_password.is_empty() {
            return Err(ControllerError::MissingBmcCredentials);
        }
        let mut secret = BMCSecret::new(name, &config.bmc_user, &config.bmc_password);
        secret.metadata.labels = Some(labels.clone());

        match self.bmc_secrets.create(&secret).await {
            Ok(_) => info!("Created BMCSecret {}", name),
            Err(e) if e.is_already_exists() => debug!("BMCSecret {} already exists", name),
            Err(e) => return Err(e.into()),
        }
        Ok(())
    }

    async fn create_bmc(&self, name: &str, ip: &str, labels: &BTreeMap<String, String>) -> Result<(), ControllerError> {
        let mut bmc = BMC::new(
            name,
            BMCSpec {
                endpoint_ref: None,
                endpoint: Some(InlineEndpoint {
                    mac_address: None,
                    ip: ip.to_string(),
                }),
                bmc_secret_ref: LocalObjectReference::new(name),
                protocol: Protocol::redfish(),
            },
        );
        bmc.metadata.labels = Some(labels.clone());

        match self.bmcs.create(&bmc).await {
            Ok(_) => info!("Created BMC {}", name),
            Err(e) if e.is_already_exists() => debug!("BMC {} already exists", name),
            Err(e) => return Err(e.into()),
        }
        Ok(())
    }

    /// Make the BMC the controller owner of its secret
    async fn set_bmc_secret_owner(&self, name: &str) -> Result<(), ControllerError> {
        let bmc = self
            .bmcs
            .get(None, name)
            .await?
            .ok_or_else(|| ControllerError::NotFoundAfterCreate {
                kind: "BMC",
                name: name.to_string(),
            })?;
        let mut secret = self
            .bmc_secrets
            .get(None, name)
            .await?
            .ok_or_else(|| ControllerError::NotFoundAfterCreate {
                kind: "BMCSecret",
                name: name.to_string(),
            })?;
        let owner = bmc
            .controller_owner_ref(&())
            .ok_or_else(|| ControllerError::OwnerReference(name.to_string()))?;

        let owners = secret.owner_references_mut();
        if owners.iter().any(|o| o.uid == owner.uid && o.controller == Some(true)) {
            debug!("BMCSecret {} is already owned by BMC {}", name, name);
            return Ok(());
        }
        // A secret has at most one controller
        owners.retain(|o| o.uid != owner.uid && o.controller != Some(true));
        owners.push(owner);

        self.bmc_secrets.patch(&secret).await?;
        debug!("Set BMC {} as owner of BMCSecret {}", name, name);
        Ok(())
    }
}
