//! Argora CRD Definitions
//!
//! Custom resources reconciled by the Argora operator, plus the subset of
//! the metal-operator and Cluster API IPAM kinds the operator reads and
//! writes.

pub mod capi;
pub mod cluster_import;
pub mod ip_pool_import;
pub mod metal;
pub mod references;
pub mod selectors;
pub mod status;
pub mod update;

pub use capi::*;
pub use cluster_import::*;
pub use ip_pool_import::*;
pub use metal::*;
pub use references::*;
pub use selectors::*;
pub use status::*;
pub use update::*;

/// API group of the Argora kinds
pub const ARGORA_GROUP: &str = "argora.cloud.sap";
