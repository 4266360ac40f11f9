//! Node name -> node address.

use super::{find_first, guarded};
use crate::error::ControllerError;
use crate::inventory::NodeInventory;
use k8s_openapi::api::core::v1::Node;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Address of type `address_type` recorded on the node named `node_name`.
///
/// The first parseable address of that type wins when a node reports several.
pub fn node_address(nodes: &[Node], node_name: &str, address_type: &str) -> Result<IpAddr, ControllerError> {
    let node = find_first(nodes, |node| node.metadata.name.as_deref() == Some(node_name))
        .ok_or_else(|| ControllerError::NodeNotFound(node_name.to_string()))?;

    node.status
        .as_ref()
        .and_then(|status| status.addresses.as_ref())
        .and_then(|addresses| {
            addresses
                .iter()
                .filter(|address| address.type_ == address_type)
                .find_map(|address| address.address.parse().ok())
        })
        .ok_or_else(|| ControllerError::NodeAddressNotFound {
            node: node_name.to_string(),
            address_type: address_type.to_string(),
        })
}

/// Resolves the role-holder node's address from the cluster inventory.
#[derive(Clone)]
pub struct NodeAddressResolver {
    inventory: Arc<dyn NodeInventory>,
    address_type: String,
    timeout: Duration,
}

impl NodeAddressResolver {
    /// Creates a resolver that reads addresses of `address_type` (e.g. `InternalIP`).
    pub fn new(inventory: Arc<dyn NodeInventory>, address_type: String, timeout: Duration) -> Self {
        Self {
            inventory,
            address_type,
            timeout,
        }
    }

    /// Resolve the current address of `node_name`.
    pub async fn resolve(&self, cancel: &CancellationToken, node_name: &str) -> Result<IpAddr, ControllerError> {
        let nodes = guarded(cancel, self.timeout, "list nodes", self.inventory.list_nodes()).await?;
        let address = node_address(&nodes, node_name, &self.address_type)?;
        debug!("Node {} has {} {}", node_name, self.address_type, address);
        Ok(address)
    }
}
