//! metal-operator kinds (`metal.ironcore.dev/v1alpha1`)
//!
//! Argora writes `BMC` and `BMCSecret` objects and reads `Server` and
//! `ServerClaim` while walking the IP address ownership chain. Only the
//! fields Argora touches are modelled; unknown fields are ignored on read.

pub mod bmc;
pub mod bmc_secret;
pub mod server;
pub mod server_claim;

pub use bmc::*;
pub use bmc_secret::*;
pub use server::*;
pub use server_claim::*;

/// API group of the metal-operator kinds
pub const METAL_GROUP: &str = "metal.ironcore.dev";
/// API version of the metal-operator kinds
pub const METAL_VERSION: &str = "v1alpha1";
