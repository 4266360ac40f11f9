//! Cluster inventory.
//!
//! The controller only needs one thing from Kubernetes: the list of nodes
//! with their addresses. The `NodeInventory` trait keeps the reconciler
//! independent of a live API server.

use crate::error::ControllerError;
use k8s_openapi::api::core::v1::Node;
use kube::api::ListParams;
use kube::{Api, Client};
use tracing::debug;

/// Source of the cluster's node records
#[async_trait::async_trait]
pub trait NodeInventory: Send + Sync {
    /// List every node in the cluster
    async fn list_nodes(&self) -> Result<Vec<Node>, ControllerError>;
}

/// Node inventory backed by the Kubernetes API
#[derive(Clone)]
pub struct KubeNodeInventory {
    api: Api<Node>,
}

impl KubeNodeInventory {
    /// Creates an inventory over all nodes visible to `client`.
    pub fn new(client: Client) -> Self {
        Self { api: Api::all(client) }
    }
}

#[async_trait::async_trait]
impl NodeInventory for KubeNodeInventory {
    async fn list_nodes(&self) -> Result<Vec<Node>, ControllerError> {
        let nodes = self.api.list(&ListParams::default()).await?;
        debug!("Listed {} nodes", nodes.items.len());
        Ok(nodes.items)
    }
}
