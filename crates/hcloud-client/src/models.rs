//! Hetzner Cloud API models
//!
//! These models cover the subset of the Hetzner Cloud API schema used by the
//! floating IP controller. Unknown fields are ignored on deserialization.
//! See: https://docs.hetzner.cloud/#servers and https://docs.hetzner.cloud/#floating-ips

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr};

/// Parse an address as returned by the API.
///
/// IPv6 values are networks (`2001:db8::/64`); the prefix length is dropped
/// and the base address returned.
#[must_use]
pub fn parse_address(value: &str) -> Option<IpAddr> {
    let base = value.split('/').next().unwrap_or(value);
    base.trim().parse().ok()
}

/// Server model matching the Hetzner Cloud `Server` schema
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Server {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub status: ServerStatus,
    pub public_net: PublicNet,
    #[serde(default)]
    pub private_net: Vec<PrivateNet>,
    #[serde(default)]
    pub labels: HashMap<String, String>,
    pub created: Option<DateTime<Utc>>,
}

impl Server {
    /// Public addresses of the server: the IPv4 address and the base address
    /// of the IPv6 network, in that order.
    #[must_use]
    pub fn public_addresses(&self) -> Vec<IpAddr> {
        let mut addresses = Vec::with_capacity(2);
        if let Some(ipv4) = &self.public_net.ipv4 {
            addresses.push(IpAddr::V4(ipv4.ip));
        }
        if let Some(ip) = self.public_net.ipv6.as_ref().and_then(|v6| parse_address(&v6.ip)) {
            addresses.push(ip);
        }
        addresses
    }

    /// Addresses the server holds on attached private networks, alias IPs included.
    #[must_use]
    pub fn private_addresses(&self) -> Vec<IpAddr> {
        self.private_net
            .iter()
            .flat_map(|net| std::iter::once(net.ip).chain(net.alias_ips.iter().copied()))
            .collect()
    }
}

/// Server status values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServerStatus {
    Running,
    Initializing,
    Starting,
    Stopping,
    Off,
    Deleting,
    Migrating,
    Rebuilding,
    #[default]
    #[serde(other)]
    Unknown,
}

/// Public network configuration of a server
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PublicNet {
    pub ipv4: Option<Ipv4Info>,
    pub ipv6: Option<Ipv6Info>,
    /// IDs of floating IPs currently assigned to this server
    #[serde(default)]
    pub floating_ips: Vec<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ipv4Info {
    pub id: Option<u64>,
    pub ip: Ipv4Addr,
    #[serde(default)]
    pub blocked: bool,
    pub dns_ptr: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ipv6Info {
    pub id: Option<u64>,
    /// IPv6 network, e.g. "2001:db8::/64"
    pub ip: String,
    #[serde(default)]
    pub blocked: bool,
}

/// Attachment of a server to a private network
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrivateNet {
    pub network: u64,
    pub ip: IpAddr,
    #[serde(default)]
    pub alias_ips: Vec<IpAddr>,
    pub mac_address: Option<String>,
}

/// Floating IP model matching the Hetzner Cloud `FloatingIP` schema
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FloatingIp {
    pub id: u64,
    pub name: String,
    pub description: Option<String>,
    /// Address value; IPv6 floating IPs are returned as a /64 network
    pub ip: String,
    #[serde(rename = "type")]
    pub ip_type: IpType,
    /// ID of the server the floating IP is assigned to
    pub server: Option<u64>,
    #[serde(default)]
    pub blocked: bool,
    pub home_location: Option<Location>,
    #[serde(default)]
    pub labels: HashMap<String, String>,
    pub created: Option<DateTime<Utc>>,
}

impl FloatingIp {
    /// Parsed address value, with any IPv6 prefix length removed.
    #[must_use]
    pub fn address(&self) -> Option<IpAddr> {
        parse_address(&self.ip)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IpType {
    Ipv4,
    Ipv6,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Location {
    pub id: Option<u64>,
    pub name: String,
    pub network_zone: Option<String>,
}

/// Action model, returned by every mutating endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Action {
    pub id: u64,
    pub command: String,
    pub status: ActionStatus,
    #[serde(default)]
    pub progress: u8,
    pub started: Option<DateTime<Utc>>,
    pub finished: Option<DateTime<Utc>>,
    #[serde(default)]
    pub resources: Vec<ResourceRef>,
    pub error: Option<ApiErrorBody>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionStatus {
    Running,
    Success,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceRef {
    pub id: u64,
    #[serde(rename = "type")]
    pub resource_type: String,
}

/// Error body carried inside error envelopes and failed actions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiErrorBody {
    pub code: String,
    pub message: String,
}

/// Error envelope: `{"error": {"code": ..., "message": ...}}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ApiErrorBody,
}

/// Request body for `POST /floating_ips/{id}/actions/assign`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssignFloatingIpRequest {
    pub server: u64,
}

// Response envelopes

/// `meta` object on list responses
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Meta {
    pub pagination: Option<Pagination>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Pagination {
    pub page: u64,
    pub per_page: u64,
    pub previous_page: Option<u64>,
    pub next_page: Option<u64>,
    pub last_page: Option<u64>,
    pub total_entries: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServersResponse {
    pub servers: Vec<Server>,
    #[serde(default)]
    pub meta: Meta,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FloatingIpsResponse {
    pub floating_ips: Vec<FloatingIp>,
    #[serde(default)]
    pub meta: Meta,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FloatingIpResponse {
    pub floating_ip: FloatingIp,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionResponse {
    pub action: Action,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_address_strips_ipv6_prefix() {
        assert_eq!(parse_address("2001:db8::/64"), "2001:db8::".parse().ok());
        assert_eq!(parse_address("203.0.113.9"), "203.0.113.9".parse().ok());
        assert_eq!(parse_address("not-an-ip"), None);
    }

    #[test]
    fn test_server_deserializes_api_payload() {
        let body = serde_json::json!({
            "id": 42,
            "name": "srv-7",
            "status": "running",
            "created": "2024-01-30T23:55:00+00:00",
            "public_net": {
                "ipv4": { "id": 1, "ip": "10.0.0.5", "blocked": false, "dns_ptr": "srv-7.example.com" },
                "ipv6": { "id": 2, "ip": "2001:db8::/64", "blocked": false },
                "floating_ips": [4711]
            },
            "private_net": [
                { "network": 9, "ip": "10.1.0.2", "alias_ips": ["10.1.0.3"], "mac_address": "86:00:00:2a:7d:e0" }
            ],
            "labels": { "role": "ingress" },
            "server_type": { "name": "cx22" }
        });

        let server: Server = serde_json::from_value(body).expect("valid server payload");
        assert_eq!(server.id, 42);
        assert_eq!(server.status, ServerStatus::Running);
        assert_eq!(
            server.public_addresses(),
            vec!["10.0.0.5".parse::<IpAddr>().expect("ip"), "2001:db8::".parse().expect("ip")]
        );
        assert_eq!(
            server.private_addresses(),
            vec!["10.1.0.2".parse::<IpAddr>().expect("ip"), "10.1.0.3".parse().expect("ip")]
        );
        assert_eq!(server.public_net.floating_ips, vec![4711]);
    }

    #[test]
    fn test_server_without_public_ipv4() {
        let body = serde_json::json!({
            "id": 1,
            "name": "ipv6-only",
            "status": "some-future-status",
            "public_net": { "ipv4": null, "ipv6": { "ip": "2001:db8:1::/64" } }
        });

        let server: Server = serde_json::from_value(body).expect("valid server payload");
        assert_eq!(server.status, ServerStatus::Unknown);
        assert_eq!(server.public_addresses(), vec!["2001:db8:1::".parse::<IpAddr>().expect("ip")]);
        assert!(server.private_addresses().is_empty());
    }

    #[test]
    fn test_floating_ip_deserializes_unassigned() {
        let body = serde_json::json!({
            "id": 4711,
            "name": "ingress",
            "description": null,
            "ip": "203.0.113.9",
            "type": "ipv4",
            "server": null,
            "blocked": false,
            "home_location": { "id": 1, "name": "fsn1", "network_zone": "eu-central" },
            "labels": {},
            "created": "2024-01-30T23:55:00+00:00"
        });

        let fip: FloatingIp = serde_json::from_value(body).expect("valid floating ip payload");
        assert_eq!(fip.ip_type, IpType::Ipv4);
        assert_eq!(fip.server, None);
        assert_eq!(fip.address(), "203.0.113.9".parse().ok());
    }

    #[test]
    fn test_failed_action_carries_error() {
        let body = serde_json::json!({
            "action": {
                "id": 13,
                "command": "assign_floating_ip",
                "status": "error",
                "progress": 100,
                "started": "2024-01-30T23:55:00+00:00",
                "finished": "2024-01-30T23:55:02+00:00",
                "resources": [{ "id": 4711, "type": "floating_ip" }],
                "error": { "code": "action_failed", "message": "Action failed" }
            }
        });

        let response: ActionResponse = serde_json::from_value(body).expect("valid action payload");
        assert_eq!(response.action.status, ActionStatus::Error);
        assert_eq!(response.action.error.map(|e| e.code), Some("action_failed".to_string()));
    }
}
