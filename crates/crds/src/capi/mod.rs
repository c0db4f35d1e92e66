//! Cluster API IPAM kinds (`ipam.cluster.x-k8s.io`)
//!
//! Argora creates `GlobalInClusterIPPool` objects and reconciles
//! `IPAddress` objects allocated from them into NetBox.

pub mod global_in_cluster_ip_pool;
pub mod ip_address;
pub mod ip_address_claim;

pub use global_in_cluster_ip_pool::*;
pub use ip_address::*;
pub use ip_address_claim::*;

/// API group of the Cluster API IPAM kinds
pub const IPAM_GROUP: &str = "ipam.cluster.x-k8s.io";
