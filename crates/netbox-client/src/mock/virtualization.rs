//! Virtualization operations for MockNetBoxClient

use super::helpers::lock;
use super::MockNetBoxClient;
use crate::error::NetBoxError;
use crate::models::*;

fn matches(filter: &str, value: &str) -> bool {
    filter.is_empty() || filter == value
}

pub fn get_clusters_by_name_region_type(
    client: &MockNetBoxClient,
    name: &str,
    region: &str,
    cluster_type: &str,
) -> Result<Vec<Cluster>, NetBoxError> {
    client.injected_failure("get_clusters_by_name_region_type")?;
    Ok(lock(&client.clusters)
        .iter()
        .filter(|(cluster, cluster_region)| {
            matches(name, &cluster.name)
                && matches(region, cluster_region)
                && matches(cluster_type, &cluster.cluster_type.slug)
        })
        .map(|(cluster, _)| cluster.clone())
        .collect())
}
