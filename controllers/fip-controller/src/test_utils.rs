//! Test utilities for unit testing resolvers, the reconciler and the loop
//!
//! This module provides helpers for creating test data and an in-memory
//! node inventory.

use crate::config::{ControllerConfig, ErrorPolicyKind};
use crate::error::ControllerError;
use crate::inventory::NodeInventory;
use k8s_openapi::api::core::v1::{Node, NodeAddress, NodeStatus};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use std::collections::VecDeque;
use std::net::IpAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Parse an address literal
pub fn ip(address: &str) -> IpAddr {
    address.parse().expect("valid IP address literal")
}

/// Helper to create a test Node with the given `(type, address)` pairs
pub fn create_test_node(name: &str, addresses: &[(&str, &str)]) -> Node {
    Node {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            ..Default::default()
        },
        status: Some(NodeStatus {
            addresses: Some(
                addresses
                    .iter()
                    .map(|(type_, address)| NodeAddress {
                        address: address.to_string(),
                        type_: type_.to_string(),
                    })
                    .collect(),
            ),
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// Helper to create a test config for the floating IP 203.0.113.9 and node-1
pub fn create_test_config() -> ControllerConfig {
    ControllerConfig {
        hcloud_token: "test-token".to_string(),
        hcloud_endpoint: "http://mock".to_string(),
        floating_ip_address: ip("203.0.113.9"),
        node_name: "node-1".to_string(),
        node_address_type: "InternalIP".to_string(),
        poll_interval: Duration::from_secs(30),
        request_timeout: Duration::from_secs(5),
        server_label_selector: None,
        match_private_networks: false,
        error_policy: ErrorPolicyKind::Fail,
        retry_min: Duration::from_secs(5),
        retry_max: Duration::from_secs(300),
    }
}

/// In-memory node inventory
///
/// Cloning shares the node list, call counter and queued failures.
#[derive(Clone)]
pub struct MockNodeInventory {
    nodes: Arc<Mutex<Vec<Node>>>,
    failures: Arc<Mutex<VecDeque<ControllerError>>>,
    list_calls: Arc<AtomicUsize>,
}

impl MockNodeInventory {
    pub fn new(nodes: Vec<Node>) -> Self {
        Self {
            nodes: Arc::new(Mutex::new(nodes)),
            failures: Arc::new(Mutex::new(VecDeque::new())),
            list_calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Fail the next `list_nodes` call with `error`
    pub fn fail_next(&self, error: ControllerError) {
        self.failures.lock().unwrap().push_back(error);
    }

    /// Replace the node list
    pub fn set_nodes(&self, nodes: Vec<Node>) {
        *self.nodes.lock().unwrap() = nodes;
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl NodeInventory for MockNodeInventory {
    async fn list_nodes(&self) -> Result<Vec<Node>, ControllerError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = self.failures.lock().unwrap().pop_front() {
            return Err(error);
        }
        Ok(self.nodes.lock().unwrap().clone())
    }
}
