//! Configured address -> floating IP.

use super::{find_first, guarded};
use crate::error::ControllerError;
use hcloud_client::{FloatingIp, HcloudClientTrait};
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// First floating IP, in listing order, whose address equals `address`.
pub fn floating_ip_for_address(floating_ips: &[FloatingIp], address: IpAddr) -> Option<&FloatingIp> {
    find_first(floating_ips, |fip| fip.address() == Some(address))
}

/// Resolves the managed floating IP from the cloud inventory.
#[derive(Clone)]
pub struct FloatingIpResolver {
    client: Arc<dyn HcloudClientTrait>,
    timeout: Duration,
}

impl FloatingIpResolver {
    /// Creates a new floating IP resolver.
    pub fn new(client: Arc<dyn HcloudClientTrait>, timeout: Duration) -> Self {
        Self { client, timeout }
    }

    /// Resolve the floating IP whose address equals `address`.
    pub async fn resolve(&self, cancel: &CancellationToken, address: IpAddr) -> Result<FloatingIp, ControllerError> {
        let floating_ips = guarded(cancel, self.timeout, "list floating IPs", async {
            self.client.list_floating_ips().await.map_err(ControllerError::from)
        })
        .await?;

        let floating_ip = floating_ip_for_address(&floating_ips, address)
            .cloned()
            .ok_or(ControllerError::FloatingIpNotAllocated(address))?;
        debug!(
            "Floating IP {} is {} (assigned to {:?})",
            address, floating_ip.id, floating_ip.server
        );
        Ok(floating_ip)
    }

    /// Re-read a floating IP by ID, right before a write.
    pub async fn refresh(&self, cancel: &CancellationToken, id: u64) -> Result<FloatingIp, ControllerError> {
        guarded(cancel, self.timeout, "get floating IP", async {
            self.client.get_floating_ip(id).await.map_err(ControllerError::from)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::*;
    use hcloud_client::mock::floating_ip;
    use hcloud_client::MockHcloudClient;

    #[test]
    fn test_matches_configured_address() {
        let fips = vec![
            floating_ip(1, "198.51.100.1", None),
            floating_ip(2, "203.0.113.9", Some(3)),
        ];

        let found = floating_ip_for_address(&fips, ip("203.0.113.9")).expect("floating ip found");
        assert_eq!(found.id, 2);
        assert_eq!(found.server, Some(3));
    }

    #[test]
    fn test_ipv6_network_matches_base_address() {
        let fips = vec![floating_ip(5, "2001:db8::/64", None)];
        assert_eq!(floating_ip_for_address(&fips, ip("2001:db8::")).map(|f| f.id), Some(5));
        assert!(floating_ip_for_address(&fips, ip("2001:db8::1")).is_none());
    }

    #[tokio::test]
    async fn test_absent_address_is_not_allocated() {
        let mock = MockHcloudClient::new();
        mock.add_floating_ip(floating_ip(1, "198.51.100.1", None));
        let resolver = FloatingIpResolver::new(Arc::new(mock), Duration::from_secs(5));

        let result = resolver.resolve(&CancellationToken::new(), ip("203.0.113.9")).await;

        assert!(matches!(result, Err(ControllerError::FloatingIpNotAllocated(_))));
    }

    #[tokio::test]
    async fn test_resolve_is_idempotent_for_same_snapshot() {
        let mock = MockHcloudClient::new();
        mock.add_floating_ip(floating_ip(1, "198.51.100.1", None));
        mock.add_floating_ip(floating_ip(2, "203.0.113.9", Some(3)));
        let resolver = FloatingIpResolver::new(Arc::new(mock), Duration::from_secs(5));
        let cancel = CancellationToken::new();

        let first = resolver.resolve(&cancel, ip("203.0.113.9")).await.expect("resolved");
        let second = resolver.resolve(&cancel, ip("203.0.113.9")).await.expect("resolved");

        assert_eq!(first.id, second.id);
        assert_eq!(first.server, second.server);
        assert_eq!(first.ip, second.ip);
    }

    #[tokio::test]
    async fn test_cancelled_resolve_does_not_report_not_found() {
        let mock = MockHcloudClient::new();
        let resolver = FloatingIpResolver::new(Arc::new(mock), Duration::from_secs(5));
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = resolver.resolve(&cancel, ip("203.0.113.9")).await;

        assert!(matches!(result, Err(ControllerError::Cancelled)));
    }
}
