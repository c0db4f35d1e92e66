//! Controller-specific error types.
//!
//! Errors of the collaborators (NetBox, configuration, object store) are
//! rendered verbatim so that status descriptions carry the original
//! message. [`ControllerError::Context`] prefixes a message the way the
//! reconcilers report which device, cluster or prefix failed.

use thiserror::Error;

use crate::config::ConfigError;
use crate::store::StoreError;
use crds::SelectorError;
use netbox_client::NetBoxError;

/// Errors that can occur in the Argora controllers.
#[derive(Debug, Error)]
pub enum ControllerError {
    /// Kubernetes API error outside the object store (client setup, watches)
    #[error("Kubernetes error: {0}")]
    Kube(#[from] kube::Error),

    /// A controller task ended or panicked
    #[error("{0}")]
    Watch(String),

    #[error(transparent)]
    NetBox(#[from] NetBoxError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Selector(#[from] SelectorError),

    /// Object without a field the reconciler relies on (name, namespace)
    #[error("{kind} is missing {field}")]
    MissingField { kind: &'static str, field: &'static str },

    // Cluster selection
    #[error("multiple clusters found")]
    MultipleClustersFound,

    // Device reconciliation
    #[error("invalid device name {0:?}: expected two parts separated by '-'")]
    InvalidDeviceName(String),

    #[error("device {0} has no OOB IP")]
    MissingOobIp(String),

    #[error("invalid OOB IP {address:?}: {reason}")]
    InvalidOobIp { address: String, reason: String },

    #[error("bmc user or password not set")]
    MissingBmcCredentials,

    #[error("{kind} {name} not found after creation")]
    NotFoundAfterCreate { kind: &'static str, name: String },

    #[error("unable to build owner reference from BMC {0}: missing uid")]
    OwnerReference(String),

    // IP pool synchronization
    #[error("invalid prefix {prefix:?}: {reason}")]
    InvalidPrefix { prefix: String, reason: String },

    #[error("excludeMask ({exclude_mask}) must be longer than prefix mask ({prefix_len}) for prefix {prefix}")]
    ExcludeMaskTooShort {
        exclude_mask: u8,
        prefix_len: u8,
        prefix: String,
    },

    #[error("excludeMask ({exclude_mask}) exceeds address length ({max_len}) for prefix {prefix}")]
    ExcludeMaskTooLong {
        exclude_mask: u8,
        max_len: u8,
        prefix: String,
    },

    #[error("prefix {0} has no site")]
    PrefixWithoutSite(String),

    #[error("site {site} does not start with region {region}")]
    SiteOutsideRegion { site: String, region: String },

    #[error("no compute number found in VLAN name {0:?} of prefix {1}")]
    MissingComputeNumber(String, String),

    // IP address reconciliation chain
    #[error("IPAddressClaim {0} not found")]
    ClaimNotFound(String),

    #[error("IPAddressClaim {0} is not owned by a ServerClaim")]
    NoServerClaimOwner(String),

    #[error("ServerClaim {0} not found")]
    ServerClaimNotFound(String),

    #[error("ServerClaim {0} is not bound to a Server")]
    ServerClaimUnbound(String),

    #[error("Server {0} not found")]
    ServerNotFound(String),

    #[error("Server {0} has no BMC reference")]
    ServerWithoutBmcRef(String),

    #[error("no LAG interface found for device {0}")]
    NoLagInterface(String),

    #[error("invalid IP address {address:?}: {reason}")]
    InvalidIpAddress { address: String, reason: String },

    #[error("IP address {address} is assigned to another interface (assigned: {assigned:?}, expected: {expected})")]
    IPAssignedToAnotherInterface {
        address: String,
        assigned: Option<u64>,
        expected: u64,
    },

    #[error("IP address {address} is assigned to another device (assigned: {assigned:?}, expected: {expected})")]
    IPAssignedToAnotherDevice {
        address: String,
        assigned: Option<u64>,
        expected: u64,
    },

    /// An error prefixed with what was being done when it occurred
    #[error("{context}: {source}")]
    Context {
        context: String,
        source: Box<ControllerError>,
    },
}

impl ControllerError {
    /// Innermost error beneath any `Context` layers
    pub fn root(&self) -> &ControllerError {
        match self {
            ControllerError::Context { source, .. } => source.root(),
            other => other,
        }
    }

    /// Whether the error is a data conflict requiring human correction
    pub fn is_conflict(&self) -> bool {
        matches!(
            self.root(),
            ControllerError::MultipleClustersFound
                | ControllerError::IPAssignedToAnotherInterface { .. }
                | ControllerError::IPAssignedToAnotherDevice { .. }
        )
    }
}

/// Attach context to errors convertible into [`ControllerError`]
pub trait ErrorContext<T> {
    fn context(self, context: &str) -> Result<T, ControllerError>;

    fn with_context<F>(self, context: F) -> Result<T, ControllerError>
    where
        F: FnOnce() -> String;
}

impl<T, E> ErrorContext<T> for Result<T, E>
where
    E: Into<ControllerError>,
{
    fn context(self, context: &str) -> Result<T, ControllerError> {
        self.with_context(|| context.to_string())
    }

    fn with_context<F>(self, context: F) -> Result<T, ControllerError>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| ControllerError::Context {
            context: context(),
            source: Box::new(e.into()),
        })
    }
}
