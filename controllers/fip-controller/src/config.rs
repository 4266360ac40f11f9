//! Controller configuration.
//!
//! Configuration is read once at startup from an optional JSON file and then
//! from environment variables, which take precedence over the file.

use crate::error::ControllerError;
use serde::Deserialize;
use std::fmt;
use std::net::IpAddr;
use std::path::Path;
use std::time::Duration;

/// Config file read when `CONFIG_FILE` is not set
pub const DEFAULT_CONFIG_FILE: &str = "config/config.json";

const DEFAULT_POLL_INTERVAL_SECONDS: u64 = 30;
const DEFAULT_REQUEST_TIMEOUT_SECONDS: u64 = 30;
const DEFAULT_NODE_ADDRESS_TYPE: &str = "InternalIP";
const DEFAULT_RETRY_MIN_SECONDS: u64 = 5;
const DEFAULT_RETRY_MAX_SECONDS: u64 = 300;

/// Shape of the optional JSON config file.
///
/// Keys are accepted in both `token` and `Token` spelling.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    #[serde(alias = "Token")]
    pub token: Option<String>,
    #[serde(alias = "Address")]
    pub address: Option<String>,
    #[serde(alias = "NodeName")]
    pub node_name: Option<String>,
    #[serde(alias = "PollIntervalSeconds")]
    pub poll_interval_seconds: Option<u64>,
}

impl FileConfig {
    /// Read the file at `path`. A missing file yields an empty config.
    pub fn read(path: &Path) -> Result<Self, ControllerError> {
        match std::fs::read_to_string(path) {
            Ok(contents) => serde_json::from_str(&contents).map_err(|e| {
                ControllerError::InvalidConfig(format!("could not decode {}: {}", path.display(), e))
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(ControllerError::InvalidConfig(format!(
                "could not open {}: {}",
                path.display(),
                e
            ))),
        }
    }
}

/// What the controller does when a cycle fails
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorPolicyKind {
    /// Every error terminates the controller
    Fail,
    /// Transport errors are retried with backoff; everything else terminates
    Retry,
}

/// Effective controller configuration
#[derive(Clone)]
pub struct ControllerConfig {
    pub hcloud_token: String,
    pub hcloud_endpoint: String,
    pub floating_ip_address: IpAddr,
    pub node_name: String,
    pub node_address_type: String,
    pub poll_interval: Duration,
    pub request_timeout: Duration,
    pub server_label_selector: Option<String>,
    pub match_private_networks: bool,
    pub error_policy: ErrorPolicyKind,
    pub retry_min: Duration,
    pub retry_max: Duration,
}

impl fmt::Debug for ControllerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ControllerConfig")
            .field("hcloud_token", &"<redacted>")
            .field("hcloud_endpoint", &self.hcloud_endpoint)
            .field("floating_ip_address", &self.floating_ip_address)
            .field("node_name", &self.node_name)
            .field("node_address_type", &self.node_address_type)
            .field("poll_interval", &self.poll_interval)
            .field("request_timeout", &self.request_timeout)
            .field("server_label_selector", &self.server_label_selector)
            .field("match_private_networks", &self.match_private_networks)
            .field("error_policy", &self.error_policy)
            .field("retry_min", &self.retry_min)
            .field("retry_max", &self.retry_max)
            .finish()
    }
}

impl ControllerConfig {
    /// Load configuration from `CONFIG_FILE` (or [`DEFAULT_CONFIG_FILE`]) and the process environment.
    pub fn load() -> Result<Self, ControllerError> {
        let path = std::env::var("CONFIG_FILE").unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());
        let file = FileConfig::read(Path::new(&path))?;
        Self::from_sources(file, |key| std::env::var(key).ok())
    }

    /// Build the configuration from a file config and an environment lookup.
    pub fn from_sources<F>(file: FileConfig, env: F) -> Result<Self, ControllerError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = |key: &str| env(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let hcloud_token = env("HCLOUD_TOKEN").or(file.token).ok_or_else(|| {
            ControllerError::InvalidConfig("HCLOUD_TOKEN environment variable is required".to_string())
        })?;

        let address = env("FLOATING_IP_ADDRESS").or(file.address).ok_or_else(|| {
            ControllerError::InvalidConfig("FLOATING_IP_ADDRESS environment variable is required".to_string())
        })?;
        let floating_ip_address = hcloud_client::parse_address(&address).ok_or_else(|| {
            ControllerError::InvalidConfig(format!("FLOATING_IP_ADDRESS is not an IP address: {}", address))
        })?;

        let node_name = env("NODE_NAME").or(file.node_name).ok_or_else(|| {
            ControllerError::InvalidConfig("NODE_NAME environment variable is required".to_string())
        })?;

        let poll_interval_seconds = match env("POLL_INTERVAL_SECONDS") {
            Some(value) => parse_seconds("POLL_INTERVAL_SECONDS", &value)?,
            None => file.poll_interval_seconds.unwrap_or(DEFAULT_POLL_INTERVAL_SECONDS),
        };
        if poll_interval_seconds == 0 {
            return Err(ControllerError::InvalidConfig(
                "POLL_INTERVAL_SECONDS must be greater than 0".to_string(),
            ));
        }

        let request_timeout_seconds = env("REQUEST_TIMEOUT_SECONDS")
            .map(|v| parse_seconds("REQUEST_TIMEOUT_SECONDS", &v))
            .transpose()?
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECONDS);
        if request_timeout_seconds == 0 {
            return Err(ControllerError::InvalidConfig(
                "REQUEST_TIMEOUT_SECONDS must be greater than 0".to_string(),
            ));
        }

        let error_policy = match env("ERROR_POLICY").as_deref() {
            None | Some("fail") => ErrorPolicyKind::Fail,
            Some("retry") => ErrorPolicyKind::Retry,
            Some(other) => {
                return Err(ControllerError::InvalidConfig(format!(
                    "ERROR_POLICY must be \"fail\" or \"retry\", got {:?}",
                    other
                )));
            }
        };

        let retry_min = env("RETRY_MIN_SECONDS")
            .map(|v| parse_seconds("RETRY_MIN_SECONDS", &v))
            .transpose()?
            .unwrap_or(DEFAULT_RETRY_MIN_SECONDS);
        let retry_max = env("RETRY_MAX_SECONDS")
            .map(|v| parse_seconds("RETRY_MAX_SECONDS", &v))
            .transpose()?
            .unwrap_or(DEFAULT_RETRY_MAX_SECONDS);
        if retry_min == 0 || retry_max < retry_min {
            return Err(ControllerError::InvalidConfig(format!(
                "retry backoff must satisfy 0 < RETRY_MIN_SECONDS <= RETRY_MAX_SECONDS (got {} and {})",
                retry_min, retry_max
            )));
        }

        let match_private_networks = match env("MATCH_PRIVATE_NETWORKS").as_deref() {
            None => false,
            Some(value) => value.parse::<bool>().map_err(|_| {
                ControllerError::InvalidConfig(format!("MATCH_PRIVATE_NETWORKS must be true or false, got {}", value))
            })?,
        };

        Ok(Self {
            hcloud_token,
            hcloud_endpoint: env("HCLOUD_ENDPOINT").unwrap_or_else(|| hcloud_client::DEFAULT_ENDPOINT.to_string()),
            floating_ip_address,
            node_name,
            node_address_type: env("NODE_ADDRESS_TYPE").unwrap_or_else(|| DEFAULT_NODE_ADDRESS_TYPE.to_string()),
            poll_interval: Duration::from_secs(poll_interval_seconds),
            request_timeout: Duration::from_secs(request_timeout_seconds),
            server_label_selector: env("HCLOUD_SERVER_LABEL_SELECTOR"),
            match_private_networks,
            error_policy,
            retry_min: Duration::from_secs(retry_min),
            retry_max: Duration::from_secs(retry_max),
        })
    }
}

fn parse_seconds(key: &str, value: &str) -> Result<u64, ControllerError> {
    value
        .parse::<u64>()
        .map_err(|_| ControllerError::InvalidConfig(format!("{} must be a whole number of seconds, got {}", key, value)))
}
