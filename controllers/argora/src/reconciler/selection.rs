//! Selector expansion
//!
//! Inventory errors are returned unwrapped so status descriptions carry
//! the NetBox message as is; callers add context at the selection loop.

use crds::{ClusterSelector, IPPoolSelector};
use netbox_client::{Cluster, NetBox, Prefix};
use tracing::debug;

use crate::error::ControllerError;

/// How many clusters a selector may resolve to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionMode {
    /// More than one match is an error
    Single,
    /// Every match is reconciled
    Multiple,
}

/// Clusters matching `selector`; empty selector fields match everything
pub async fn select_clusters(
    netbox: &dyn NetBox,
    selector: &ClusterSelector,
    mode: SelectionMode,
) -> Result<Vec<Cluster>, ControllerError> {
    let clusters = netbox
        .get_clusters_by_name_region_type(&selector.name, &selector.region, &selector.cluster_type)
        .await?;
    debug!(
        "Selector (name={:?}, region={:?}, type={:?}) matched {} cluster(s)",
        selector.name,
        selector.region,
        selector.cluster_type,
        clusters.len()
    );

    if mode == SelectionMode::Single && clusters.len() > 1 {
        return Err(ControllerError::MultipleClustersFound);
    }
    Ok(clusters)
}

/// Prefixes matching the region and role of `selector`, one pool each
pub async fn select_prefixes(netbox: &dyn NetBox, selector: &IPPoolSelector) -> Result<Vec<Prefix>, ControllerError> {
    let prefixes = netbox
        .get_prefixes_by_region_role(&selector.region, &selector.role)
        .await?;
    debug!(
        "Selector (region={:?}, role={:?}) matched {} prefix(es)",
        selector.region,
        selector.role,
        prefixes.len()
    );
    Ok(prefixes)
}
