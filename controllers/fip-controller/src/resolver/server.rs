//! Address -> server.

use super::{find_first, guarded};
use crate::error::ControllerError;
use hcloud_client::{HcloudClientTrait, Server};
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// First server, in listing order, whose public address equals `address`.
///
/// Comparison is exact value equality. With `match_private_networks` the
/// server's private network addresses are considered too.
pub fn server_for_address(servers: &[Server], address: IpAddr, match_private_networks: bool) -> Option<&Server> {
    find_first(servers, |server| {
        server.public_addresses().contains(&address)
            || (match_private_networks && server.private_addresses().contains(&address))
    })
}

/// Resolves the server that owns a node address.
#[derive(Clone)]
pub struct ServerResolver {
    client: Arc<dyn HcloudClientTrait>,
    label_selector: Option<String>,
    match_private_networks: bool,
    timeout: Duration,
}

impl ServerResolver {
    /// Creates a new server resolver.
    pub fn new(
        client: Arc<dyn HcloudClientTrait>,
        label_selector: Option<String>,
        match_private_networks: bool,
        timeout: Duration,
    ) -> Self {
        Self {
            client,
            label_selector,
            match_private_networks,
            timeout,
        }
    }

    /// Resolve the server whose address equals `address`.
    pub async fn resolve(&self, cancel: &CancellationToken, address: IpAddr) -> Result<Server, ControllerError> {
        let servers = guarded(cancel, self.timeout, "list servers", async {
            self.client
                .list_servers(self.label_selector.as_deref())
                .await
                .map_err(ControllerError::from)
        })
        .await?;

        let server = server_for_address(&servers, address, self.match_private_networks)
            .cloned()
            .ok_or(ControllerError::ServerNotFound(address))?;
        debug!("Address {} belongs to server {} ({})", address, server.name, server.id);
        Ok(server)
    }
}
