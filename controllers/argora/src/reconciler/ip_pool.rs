//! IP pool synchronizer
//!
//! Every NetBox prefix matched by an `IPPoolSelector` becomes one
//! `GlobalInClusterIPPool`. Pools are created once; an existing pool of the
//! same name is left as it is.

use crds::{GlobalInClusterIPPool, GlobalInClusterIPPoolSpec, IPPoolSelector};
use netbox_client::{NetBox, Prefix};
use tracing::{debug, info};

use super::selection::select_prefixes;
use super::Reconciler;
use crate::error::{ControllerError, ErrorContext};
use crate::network::Cidr;

/// Prefix role slug marker selecting the compute transit naming scheme
pub const COMPUTE_TRANSIT_ROLE: &str = "compute-transit";

const COMPUTE_MARKER: &str = "compute";

/// `N` of the leftmost `compute<N>` in a VLAN name, e.g. 3 for
/// `cp-compute3-transit`. A `compute` without digits is skipped.
pub fn compute_number(vlan_name: &str) -> Option<u32> {
    vlan_name.match_indices(COMPUTE_MARKER).find_map(|(index, marker)| {
        let rest = &vlan_name[index + marker.len()..];
        let digits: String = rest.chars().take_while(char::is_ascii_digit).collect();
        digits.parse().ok()
    })
}

fn is_compute_transit(prefix: &Prefix) -> bool {
    prefix
        .role
        .as_ref()
        .is_some_and(|role| role.slug.contains(COMPUTE_TRANSIT_ROLE))
}

/// Name of the pool created for `prefix`
pub fn pool_name(selector: &IPPoolSelector, prefix: &Prefix) -> Result<String, ControllerError> {
    if let Some(name) = selector.name_override.as_deref().filter(|n| !n.is_empty()) {
        return Ok(name.to_string());
    }
    let name_prefix = selector.name_prefix.as_deref().unwrap_or_default();
    let site = prefix
        .site
        .as_ref()
        .ok_or_else(|| ControllerError::PrefixWithoutSite(prefix.prefix.clone()))?;

    if !is_compute_transit(prefix) {
        return Ok(format!("{}-{}", name_prefix, site.slug));
    }

    let az = site
        .slug
        .strip_prefix(selector.region.as_str())
        .ok_or_else(|| ControllerError::SiteOutsideRegion {
            site: site.slug.clone(),
            region: selector.region.clone(),
        })?;
    let vlan_name = prefix.vlan.as_ref().map(|v| v.name.as_str()).unwrap_or_default();
    let number = compute_number(vlan_name)
        .ok_or_else(|| ControllerError::MissingComputeNumber(vlan_name.to_string(), prefix.prefix.clone()))?;
    let index = number.checked_sub(1).ok_or_else(|| ControllerError::InvalidPrefix {
        prefix: prefix.prefix.clone(),
        reason: format!("compute number in VLAN name {:?} must be at least 1", vlan_name),
    })?;

    Ok(format!("{}-{}{}-{}", name_prefix, az, index, selector.region))
}

/// Excluded entries: the `excludeMask` block, the verbatim addresses, then
/// the last N host addresses
pub fn excluded_addresses(selector: &IPPoolSelector, cidr: &Cidr) -> Result<Vec<String>, ControllerError> {
    let mut excluded = Vec::new();

    if let Some(mask) = selector.exclude_mask {
        if mask <= cidr.prefix_len() {
            return Err(ControllerError::ExcludeMaskTooShort {
                exclude_mask: mask,
                prefix_len: cidr.prefix_len(),
                prefix: cidr.to_string(),
            });
        }
        let block = cidr.masked(mask).ok_or_else(|| ControllerError::ExcludeMaskTooLong {
            exclude_mask: mask,
            max_len: cidr.max_len(),
            prefix: cidr.to_string(),
        })?;
        excluded.push(block.to_string());
    }

    excluded.extend(selector.excluded_addresses.iter().cloned());

    if let Some(n) = selector.exclude_last_n_addresses {
        excluded.extend(cidr.last_host_addresses(n).into_iter().map(|ip| ip.to_string()));
    }
    Ok(excluded)
}

/// The pool derived from `prefix`, validated but not yet persisted
pub fn build_ip_pool(selector: &IPPoolSelector, prefix: &Prefix) -> Result<GlobalInClusterIPPool, ControllerError> {
    let cidr: Cidr = prefix
        .prefix
        .parse()
        .map_err(|reason| ControllerError::InvalidPrefix {
            prefix: prefix.prefix.clone(),
            reason,
        })?;
    let gateway = cidr.offset(1).ok_or_else(|| ControllerError::InvalidPrefix {
        prefix: prefix.prefix.clone(),
        reason: "no room for a gateway".to_string(),
    })?;
    let name = pool_name(selector, prefix)?;

    Ok(GlobalInClusterIPPool::new(
        &name,
        GlobalInClusterIPPoolSpec {
            addresses: vec![prefix.prefix.clone()],
            prefix: cidr.prefix_len(),
            gateway: Some(gateway.to_string()),
            excluded_addresses: excluded_addresses(selector, &cidr)?,
        },
    ))
}

impl Reconciler {
    /// Create the pools of every selector, stopping at the first failure
    pub(crate) async fn reconcile_ip_pool_selectors(
        &self,
        netbox: &dyn NetBox,
        selectors: &[IPPoolSelector],
    ) -> Result<(), ControllerError> {
        for selector in selectors {
            selector.validate()?;
            let prefixes = select_prefixes(netbox, selector).await?;
            info!(
                "Reconciling {} prefix(es) for ip pool {}",
                prefixes.len(),
                selector.display_name()
            );
            for prefix in &prefixes {
                self.reconcile_prefix(selector, prefix).await.with_context(|| {
                    format!(
                        "unable to reconcile prefix {} for ip pool {}",
                        prefix.prefix,
                        selector.display_name()
                    )
                })?;
            }
        }
        Ok(())
    }

    async fn reconcile_prefix(&self, selector: &IPPoolSelector, prefix: &Prefix) -> Result<(), ControllerError> {
        let pool = build_ip_pool(selector, prefix)?;
        let name = pool.metadata.name.clone().unwrap_or_default();

        if self.ip_pools.get(None, &name).await?.is_some() {
            debug!("GlobalInClusterIPPool {} already exists, skipping", name);
            return Ok(());
        }
        match self.ip_pools.create(&pool).await {
            Ok(_) => info!("Created GlobalInClusterIPPool {} for prefix {}", name, prefix.prefix),
            Err(e) if e.is_already_exists() => debug!("GlobalInClusterIPPool {} already exists", name),
            Err(e) => return Err(e.into()),
        }
        Ok(())
    }
}
