//! Controller-specific error types.
//!
//! This module defines the errors the Floating IP Controller surfaces,
//! wrapping the upstream Kubernetes and Hetzner Cloud client errors, and
//! classifies them so the error policy can decide between retrying and
//! terminating.

use hcloud_client::HcloudError;
use kube::Error as KubeError;
use std::net::IpAddr;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur in the Floating IP Controller.
#[derive(Debug, Error)]
pub enum ControllerError {
    /// Kubernetes API error
    #[error("Kubernetes error: {0}")]
    Kube(#[from] KubeError),

    /// Hetzner Cloud API error
    #[error("Hetzner Cloud error: {0}")]
    Hcloud(#[from] HcloudError),

    /// No node with the configured name exists in the cluster
    #[error("Node not found: {0}")]
    NodeNotFound(String),

    /// The node exists but has no address of the requested type
    #[error("Node {node} has no {address_type} address")]
    NodeAddressNotFound {
        /// Node name
        node: String,
        /// Address type looked for, e.g. `InternalIP`
        address_type: String,
    },

    /// No server carries the node's address
    #[error("No server with IP address {0} found")]
    ServerNotFound(IpAddr),

    /// The configured floating IP does not exist in the project
    #[error("IP address {0} not allocated")]
    FloatingIpNotAllocated(IpAddr),

    /// The assign call was rejected
    #[error("Could not assign floating IP {address} to server {server}: {source}")]
    AssignmentFailed {
        /// Floating IP address
        address: IpAddr,
        /// Target server name
        server: String,
        /// Underlying client error
        #[source]
        source: HcloudError,
    },

    /// An external call did not finish within the request timeout
    #[error("{operation} timed out after {}s", .timeout.as_secs())]
    Timeout {
        /// What was being done
        operation: String,
        /// The timeout that elapsed
        timeout: Duration,
    },

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Shutdown was requested while the operation was in flight
    #[error("Operation cancelled")]
    Cancelled,
}

/// Coarse classification used by the error policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A required record is missing from an inventory snapshot
    NotFound,
    /// Talking to an external API failed
    Transport,
    /// Bad configuration or credentials
    Config,
    /// Clean shutdown
    Cancelled,
}

impl ControllerError {
    /// Classify the error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            ControllerError::NodeNotFound(_)
            | ControllerError::NodeAddressNotFound { .. }
            | ControllerError::ServerNotFound(_)
            | ControllerError::FloatingIpNotAllocated(_) => ErrorKind::NotFound,
            ControllerError::Hcloud(e) | ControllerError::AssignmentFailed { source: e, .. } => hcloud_kind(e),
            ControllerError::Kube(_) | ControllerError::Timeout { .. } => ErrorKind::Transport,
            ControllerError::InvalidConfig(_) => ErrorKind::Config,
            ControllerError::Cancelled => ErrorKind::Cancelled,
        }
    }
}

// Not-found and rejected credentials are final, every other client error is transport
fn hcloud_kind(error: &HcloudError) -> ErrorKind {
    match error {
        HcloudError::NotFound(_) => ErrorKind::NotFound,
        HcloudError::Authentication(_) | HcloudError::InvalidRequest(_) => ErrorKind::Config,
        HcloudError::Http(_) | HcloudError::Serialization(_) | HcloudError::Api { .. } => ErrorKind::Transport,
    }
}
