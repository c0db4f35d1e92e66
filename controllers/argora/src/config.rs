//! Operator configuration
//!
//! Two sources feed the operator:
//! - `config.json` (ConfigMap mount): `serverController`, default `ironCore`
//!   cluster selectors, `netboxUrl`
//! - `credentials.json` (Secret mount): base64 encoded `bmcUser`,
//!   `bmcPassword`, `netboxToken`
//!
//! Both files are re-read on every reconciliation pass through
//! [`ConfigSource::reload`], which returns an immutable [`Config`] snapshot.
//! Process-level settings (paths, namespace, interval) come from the
//! environment once at startup, see [`OperatorSettings`].

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use crds::ClusterSelector;
use serde::Deserialize;
use thiserror::Error;

/// Default mount path of `config.json`
pub const DEFAULT_CONFIG_PATH: &str = "/etc/config/config.json";
/// Default mount path of `credentials.json`
pub const DEFAULT_CREDENTIALS_PATH: &str = "/etc/credentials/credentials.json";

/// Configuration and credential errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unable to read {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("unable to parse {path}: {source}")]
    Parse {
        path: String,
        source: serde_json::Error,
    },

    #[error("unable to decode {field}: {reason}")]
    Decode { field: &'static str, reason: String },

    #[error("{0} is required")]
    Missing(&'static str),

    #[error("invalid {field} {value:?}: expected one of {expected}")]
    Invalid {
        field: &'static str,
        value: String,
        expected: &'static str,
    },
}

/// Which server operator consumes the imported BMC objects
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerController {
    IronCore,
    Metal3,
}

impl FromStr for ServerController {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ironcore" => Ok(ServerController::IronCore),
            "metal3" => Ok(ServerController::Metal3),
            "" => Err(ConfigError::Missing("serverController")),
            other => Err(ConfigError::Invalid {
                field: "serverController",
                value: other.to_string(),
                expected: "ironcore, metal3",
            }),
        }
    }
}

/// A validated snapshot of configuration and credentials
#[derive(Clone, PartialEq, Eq)]
pub struct Config {
    pub server_controller: ServerController,
    /// Cluster selectors used by `ClusterImport` objects without selectors
    pub iron_core: Vec<ClusterSelector>,
    pub netbox_url: String,
    pub netbox_token: String,
    pub bmc_user: String,
    pub bmc_password: String,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("server_controller", &self.server_controller)
            .field("iron_core", &self.iron_core)
            .field("netbox_url", &self.netbox_url)
            .field("netbox_token", &"<redacted>")
            .field("bmc_user", &self.bmc_user)
            .field("bmc_password", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConfigFile {
    #[serde(default)]
    server_controller: String,
    #[serde(default)]
    iron_core: Vec<ClusterSelector>,
    #[serde(default)]
    netbox_url: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CredentialsFile {
    #[serde(default)]
    bmc_user: String,
    #[serde(default)]
    bmc_password: String,
    #[serde(default)]
    netbox_token: String,
}

impl Config {
    /// Build a snapshot from the raw file contents
    pub fn parse(config_json: &str, credentials_json: &str) -> Result<Self, ConfigError> {
        let config: ConfigFile = serde_json::from_str(config_json).map_err(|source| ConfigError::Parse {
            path: "config".to_string(),
            source,
        })?;
        let credentials: CredentialsFile =
            serde_json::from_str(credentials_json).map_err(|source| ConfigError::Parse {
                path: "credentials".to_string(),
                source,
            })?;
        Self::from_files(config, credentials)
    }

    fn from_files(config: ConfigFile, credentials: CredentialsFile) -> Result<Self, ConfigError> {
        let snapshot = Self {
            server_controller: config.server_controller.parse()?,
            iron_core: config.iron_core,
            netbox_url: config.netbox_url,
            netbox_token: decode_base64("netboxToken", &credentials.netbox_token)?,
            bmc_user: decode_base64("bmcUser", &credentials.bmc_user)?,
            bmc_password: decode_base64("bmcPassword", &credentials.bmc_password)?,
        };
        snapshot.validate()?;
        Ok(snapshot)
    }

    /// Required fields must be non-empty. BMC credentials are only checked
    /// where a BMC secret is about to be created.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.netbox_url.is_empty() {
            return Err(ConfigError::Missing("netboxUrl"));
        }
        if self.netbox_token.is_empty() {
            return Err(ConfigError::Missing("netboxToken"));
        }
        Ok(())
    }
}

fn decode_base64(field: &'static str, value: &str) -> Result<String, ConfigError> {
    let bytes = STANDARD
        .decode(value.trim())
        .map_err(|e| ConfigError::Decode {
            field,
            reason: e.to_string(),
        })?;
    String::from_utf8(bytes).map_err(|e| ConfigError::Decode {
        field,
        reason: e.to_string(),
    })
}

/// Source of fresh configuration snapshots
pub trait ConfigSource: Send + Sync {
    fn reload(&self) -> Result<Config, ConfigError>;
}

/// Reads `config.json` and `credentials.json` from disk on every reload
#[derive(Debug, Clone)]
pub struct FileConfigSource {
    config_path: PathBuf,
    credentials_path: PathBuf,
}

impl FileConfigSource {
    pub fn new(config_path: impl Into<PathBuf>, credentials_path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: config_path.into(),
            credentials_path: credentials_path.into(),
        }
    }
}

fn read_json<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T, ConfigError> {
    let display = path.display().to_string();
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: display.clone(),
        source,
    })?;
    serde_json::from_str(&contents).map_err(|source| ConfigError::Parse { path: display, source })
}

impl ConfigSource for FileConfigSource {
    fn reload(&self) -> Result<Config, ConfigError> {
        let config = read_json(&self.config_path)?;
        let credentials = read_json(&self.credentials_path)?;
        Config::from_files(config, credentials)
    }
}

/// Process settings read from the environment at startup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperatorSettings {
    pub config_path: PathBuf,
    pub credentials_path: PathBuf,
    /// Namespace of the watched custom resources, all namespaces if unset
    pub namespace: Option<String>,
    /// Interval of the periodic trigger and of requeues after success
    pub reconcile_interval: Duration,
    /// Concurrent reconciliations per controller
    pub concurrency: u16,
}

impl OperatorSettings {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let interval_secs = match lookup("ARGORA_RECONCILE_INTERVAL_SECS") {
            Some(value) => value.parse::<u64>().map_err(|_| ConfigError::Invalid {
                field: "ARGORA_RECONCILE_INTERVAL_SECS",
                value,
                expected: "a positive number of seconds",
            })?,
            None => 300,
        };
        if interval_secs == 0 {
            return Err(ConfigError::Invalid {
                field: "ARGORA_RECONCILE_INTERVAL_SECS",
                value: "0".to_string(),
                expected: "a positive number of seconds",
            });
        }

        let concurrency = match lookup("ARGORA_CONCURRENCY") {
            Some(value) => value.parse::<u16>().map_err(|_| ConfigError::Invalid {
                field: "ARGORA_CONCURRENCY",
                value,
                expected: "a number of workers",
            })?,
            None => 1,
        };

        Ok(Self {
            config_path: lookup("ARGORA_CONFIG_PATH")
                .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string())
                .into(),
            credentials_path: lookup("ARGORA_CREDENTIALS_PATH")
                .unwrap_or_else(|| DEFAULT_CREDENTIALS_PATH.to_string())
                .into(),
            namespace: lookup("WATCH_NAMESPACE").filter(|ns| !ns.is_empty()),
            reconcile_interval: Duration::from_secs(interval_secs),
            concurrency: concurrency.max(1),
        })
    }
}
