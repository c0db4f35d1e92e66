//! NetBox REST API Client
//!
//! A Rust client library for the parts of the NetBox REST API the Argora
//! operator consumes: clusters, devices, sites, interfaces, IP addresses
//! and prefixes.
//!
//! # Example
//!
//! ```no_run
//! use netbox_client::{HttpConnector, NetBoxConnector, Virtualization, Dcim};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let netbox = HttpConnector.connect("https://netbox.example", "your-api-token")?;
//!
//! // Empty filters are wildcards
//! for cluster in netbox.get_clusters_by_name_region_type("", "qa-de-1", "cc-k8s").await? {
//!     let devices = netbox.get_devices_by_cluster_id(cluster.id).await?;
//!     println!("{}: {} devices", cluster.name, devices.len());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Features
//!
//! - **Capability traits**: `Virtualization`, `Dcim`, `Ipam`, `Extras`,
//!   composed into `NetBox`
//! - **Connector**: `NetBoxConnector` builds a fresh client per call
//! - **Pagination**: list endpoints follow `next` links to the end
//! - **Mock**: `MockNetBoxClient` behind the `test-util` feature

pub mod client;
pub mod common;
pub mod error;
pub mod models;
#[path = "trait.rs"]
pub mod netbox_trait;
#[cfg(any(test, feature = "test-util"))]
pub mod mock;

pub use client::{HttpConnector, NetBoxClient};
pub use common::{HttpClient, PaginatedResponse};
pub use error::NetBoxError;
pub use models::*;
pub use netbox_trait::{Dcim, Extras, Ipam, NetBox, NetBoxConnector, Virtualization};
#[cfg(any(test, feature = "test-util"))]
pub use mock::MockNetBoxClient;
