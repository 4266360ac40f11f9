//! Reconciliation logic for the managed floating IP.
//!
//! One cycle resolves the role-holder node's address, the server that owns
//! it and the floating IP, then re-points the floating IP if its assignee
//! differs from that server. The only mutation is the assign action.

use crate::config::ControllerConfig;
use crate::error::ControllerError;
use crate::inventory::NodeInventory;
use crate::resolver::{guarded, FloatingIpResolver, NodeAddressResolver, ServerResolver};
use hcloud_client::{FloatingIp, HcloudClientTrait, Server};
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// What to do with the floating IP given the resolved server
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignmentDecision {
    /// The floating IP already points at the server
    AlreadyAssigned,
    /// The floating IP must be re-pointed
    Reassign {
        /// Current assignee, `None` when unassigned
        from: Option<u64>,
        /// Target server
        to: u64,
    },
}

/// Compare the floating IP's assignee with the resolved server.
#[must_use]
pub fn decide(floating_ip: &FloatingIp, server: &Server) -> AssignmentDecision {
    if floating_ip.server == Some(server.id) {
        AssignmentDecision::AlreadyAssigned
    } else {
        AssignmentDecision::Reassign {
            from: floating_ip.server,
            to: server.id,
        }
    }
}

/// Result of a successful cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// Nothing to do
    AlreadyAssigned { floating_ip: u64, server: u64 },
    /// One assign action was issued
    Reassigned {
        floating_ip: u64,
        from: Option<u64>,
        to: u64,
    },
    /// Another writer moved the floating IP to the target between the read and the write
    AssignedConcurrently { floating_ip: u64, server: u64 },
}

/// Runs reconciliation cycles for one floating IP and one node.
pub struct Reconciler {
    node_resolver: NodeAddressResolver,
    server_resolver: ServerResolver,
    floating_ip_resolver: FloatingIpResolver,
    hcloud_client: Arc<dyn HcloudClientTrait>,
    node_name: String,
    floating_ip_address: IpAddr,
    request_timeout: Duration,
}

impl Reconciler {
    /// Creates a new reconciler over the given inventories.
    pub fn new(
        node_inventory: Arc<dyn NodeInventory>,
        hcloud_client: Arc<dyn HcloudClientTrait>,
        config: &ControllerConfig,
    ) -> Self {
        Self {
            node_resolver: NodeAddressResolver::new(
                node_inventory,
                config.node_address_type.clone(),
                config.request_timeout,
            ),
            server_resolver: ServerResolver::new(
                hcloud_client.clone(),
                config.server_label_selector.clone(),
                config.match_private_networks,
                config.request_timeout,
            ),
            floating_ip_resolver: FloatingIpResolver::new(hcloud_client.clone(), config.request_timeout),
            hcloud_client,
            node_name: config.node_name.clone(),
            floating_ip_address: config.floating_ip_address,
            request_timeout: config.request_timeout,
        }
    }

    /// Run one cycle.
    ///
    /// Errors from any step end the cycle unchanged; the assign call is
    /// never repeated within a cycle.
    pub async fn reconcile(&self, cancel: &CancellationToken) -> Result<ReconcileOutcome, ControllerError> {
        let address = self.node_resolver.resolve(cancel, &self.node_name).await?;
        let server = self.server_resolver.resolve(cancel, address).await?;
        let floating_ip = self.floating_ip_resolver.resolve(cancel, self.floating_ip_address).await?;

        match decide(&floating_ip, &server) {
            AssignmentDecision::AlreadyAssigned => {
                info!(
                    "Floating IP {} already assigned to {} ({})",
                    self.floating_ip_address, server.name, server.id
                );
                Ok(ReconcileOutcome::AlreadyAssigned {
                    floating_ip: floating_ip.id,
                    server: server.id,
                })
            }
            AssignmentDecision::Reassign { to, .. } => {
                // Re-read right before the write so a concurrent move to the same target is not repeated
                let current = self.floating_ip_resolver.refresh(cancel, floating_ip.id).await?;
                if current.server == Some(to) {
                    info!(
                        "Floating IP {} was assigned to {} ({}) concurrently, skipping",
                        self.floating_ip_address, server.name, server.id
                    );
                    return Ok(ReconcileOutcome::AssignedConcurrently {
                        floating_ip: floating_ip.id,
                        server: to,
                    });
                }

                self.assign(cancel, &current, &server).await?;
                info!(
                    "Switching floating IP {} from {:?} to {} ({})",
                    self.floating_ip_address, current.server, server.name, server.id
                );
                Ok(ReconcileOutcome::Reassigned {
                    floating_ip: floating_ip.id,
                    from: current.server,
                    to,
                })
            }
        }
    }

    async fn assign(
        &self,
        cancel: &CancellationToken,
        floating_ip: &FloatingIp,
        server: &Server,
    ) -> Result<(), ControllerError> {
        let action = guarded(cancel, self.request_timeout, "assign floating IP", async {
            self.hcloud_client
                .assign_floating_ip(floating_ip.id, server.id)
                .await
                .map_err(|source| ControllerError::AssignmentFailed {
                    address: self.floating_ip_address,
                    server: server.name.clone(),
                    source,
                })
        })
        .await?;
        debug!("Assign action {} is {:?}", action.id, action.status);
        Ok(())
    }
}
