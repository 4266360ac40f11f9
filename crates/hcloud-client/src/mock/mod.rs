//! Mock HcloudClient for unit testing
//!
//! This module provides an in-memory implementation of `HcloudClientTrait`
//! that can be used in unit tests without talking to the Hetzner Cloud API.
//!
//! Besides holding servers and floating IPs, the mock records every call,
//! can fail a given operation on demand, and can simulate another actor
//! moving a floating IP between a read and a write.

use crate::error::HcloudError;
use crate::hcloud_trait::HcloudClientTrait;
use crate::models::*;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Operations the mock can count and fail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    ValidateToken,
    ListServers,
    ListFloatingIps,
    GetFloatingIp,
    AssignFloatingIp,
}

/// Mock HcloudClient for testing
///
/// Cloning shares the underlying state, so a test can keep a handle for
/// assertions after handing a clone to the code under test.
#[derive(Debug, Clone)]
pub struct MockHcloudClient {
    // Listing order is insertion order, like the API's default sort by ID
    servers: Arc<Mutex<Vec<Server>>>,
    floating_ips: Arc<Mutex<Vec<FloatingIp>>>,
    failures: Arc<Mutex<HashMap<Operation, VecDeque<HcloudError>>>>,
    calls: Arc<Mutex<HashMap<Operation, usize>>>,
    assignments: Arc<Mutex<Vec<(u64, u64)>>>,
    pending_external_moves: Arc<Mutex<Vec<(u64, Option<u64>)>>>,
    next_action_id: Arc<Mutex<u64>>,
}

impl Default for MockHcloudClient {
    fn default() -> Self {
        Self::new()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MockHcloudClient {
    /// Create a new mock client
    pub fn new() -> Self {
        Self {
            servers: Arc::new(Mutex::new(Vec::new())),
            floating_ips: Arc::new(Mutex::new(Vec::new())),
            failures: Arc::new(Mutex::new(HashMap::new())),
            calls: Arc::new(Mutex::new(HashMap::new())),
            assignments: Arc::new(Mutex::new(Vec::new())),
            pending_external_moves: Arc::new(Mutex::new(Vec::new())),
            next_action_id: Arc::new(Mutex::new(1)),
        }
    }

    /// Add a server to the mock store (for test setup)
    pub fn add_server(&self, server: Server) {
        lock(&self.servers).push(server);
    }

    /// Add a floating IP to the mock store (for test setup)
    pub fn add_floating_ip(&self, floating_ip: FloatingIp) {
        lock(&self.floating_ips).push(floating_ip);
    }

    /// Make the next call of `operation` fail with `error`.
    ///
    /// Errors queue up: calling this twice fails the next two calls.
    pub fn fail_next(&self, operation: Operation, error: HcloudError) {
        lock(&self.failures).entry(operation).or_default().push_back(error);
    }

    /// Reassign `floating_ip_id` to `server_id` right before the next
    /// `get_floating_ip` answers, as if another client had done it.
    pub fn move_before_next_get(&self, floating_ip_id: u64, server_id: u64) {
        lock(&self.pending_external_moves).push((floating_ip_id, Some(server_id)));
    }

    /// Unassign `floating_ip_id` right before the next `get_floating_ip` answers.
    pub fn unassign_before_next_get(&self, floating_ip_id: u64) {
        lock(&self.pending_external_moves).push((floating_ip_id, None));
    }

    /// Number of times `operation` was called
    pub fn call_count(&self, operation: Operation) -> usize {
        lock(&self.calls).get(&operation).copied().unwrap_or(0)
    }

    /// `(floating_ip_id, server_id)` pairs of every successful assign call
    pub fn assignments(&self) -> Vec<(u64, u64)> {
        lock(&self.assignments).clone()
    }

    /// Current assignee of a floating IP
    pub fn assignee(&self, floating_ip_id: u64) -> Option<u64> {
        lock(&self.floating_ips)
            .iter()
            .find(|fip| fip.id == floating_ip_id)
            .and_then(|fip| fip.server)
    }

    fn record(&self, operation: Operation) -> Result<(), HcloudError> {
        *lock(&self.calls).entry(operation).or_insert(0) += 1;
        match lock(&self.failures).get_mut(&operation).and_then(VecDeque::pop_front) {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn set_assignee(&self, floating_ip_id: u64, server_id: Option<u64>) -> Result<(), HcloudError> {
        let mut floating_ips = lock(&self.floating_ips);
        let fip = floating_ips
            .iter_mut()
            .find(|fip| fip.id == floating_ip_id)
            .ok_or_else(|| HcloudError::NotFound(format!("floating IP {}", floating_ip_id)))?;
        fip.server = server_id;
        Ok(())
    }

    fn next_action_id(&self) -> u64 {
        let mut id = lock(&self.next_action_id);
        let current = *id;
        *id += 1;
        current
    }
}

#[async_trait::async_trait]
impl HcloudClientTrait for MockHcloudClient {
    async fn validate_token(&self) -> Result<(), HcloudError> {
        self.record(Operation::ValidateToken)
    }

    async fn list_servers(&self, label_selector: Option<&str>) -> Result<Vec<Server>, HcloudError> {
        self.record(Operation::ListServers)?;
        let servers = lock(&self.servers);
        // Only equality selectors ("key=value") are understood by the mock
        let selector = label_selector.and_then(|s| s.split_once('='));
        Ok(servers
            .iter()
            .filter(|server| match selector {
                Some((key, value)) => server.labels.get(key).map(String::as_str) == Some(value),
                None => true,
            })
            .cloned()
            .collect())
    }

    async fn list_floating_ips(&self) -> Result<Vec<FloatingIp>, HcloudError> {
        self.record(Operation::ListFloatingIps)?;
        Ok(lock(&self.floating_ips).clone())
    }

    async fn get_floating_ip(&self, id: u64) -> Result<FloatingIp, HcloudError> {
        self.record(Operation::GetFloatingIp)?;
        let moves: Vec<(u64, Option<u64>)> = lock(&self.pending_external_moves).drain(..).collect();
        for (floating_ip_id, server_id) in moves {
            self.set_assignee(floating_ip_id, server_id)?;
        }
        lock(&self.floating_ips)
            .iter()
            .find(|fip| fip.id == id)
            .cloned()
            .ok_or_else(|| HcloudError::NotFound(format!("GET /floating_ips/{}", id)))
    }

    async fn assign_floating_ip(&self, floating_ip_id: u64, server_id: u64) -> Result<Action, HcloudError> {
        self.record(Operation::AssignFloatingIp)?;
        if !lock(&self.servers).iter().any(|server| server.id == server_id) {
            return Err(HcloudError::Api {
                code: "invalid_input".to_string(),
                message: format!("server {} not found", server_id),
            });
        }
        self.set_assignee(floating_ip_id, Some(server_id))?;
        lock(&self.assignments).push((floating_ip_id, server_id));

        Ok(Action {
            id: self.next_action_id(),
            command: "assign_floating_ip".to_string(),
            status: ActionStatus::Success,
            progress: 100,
            started: None,
            finished: None,
            resources: vec![
                ResourceRef { id: floating_ip_id, resource_type: "floating_ip".to_string() },
                ResourceRef { id: server_id, resource_type: "server".to_string() },
            ],
            error: None,
        })
    }
}

/// Build a server with a public IPv4 address (for test setup)
pub fn server(id: u64, name: &str, public_ipv4: &str) -> Server {
    Server {
        id,
        name: name.to_string(),
        status: ServerStatus::Running,
        public_net: PublicNet {
            ipv4: public_ipv4.parse().ok().map(|ip| Ipv4Info {
                id: None,
                ip,
                blocked: false,
                dns_ptr: None,
            }),
            ipv6: None,
            floating_ips: Vec::new(),
        },
        private_net: Vec::new(),
        labels: HashMap::new(),
        created: None,
    }
}

/// Build an IPv4 floating IP, optionally assigned to a server (for test setup)
pub fn floating_ip(id: u64, ip: &str, server: Option<u64>) -> FloatingIp {
    FloatingIp {
        id,
        name: format!("fip-{}", id),
        description: None,
        ip: ip.to_string(),
        ip_type: if ip.contains(':') { IpType::Ipv6 } else { IpType::Ipv4 },
        server,
        blocked: false,
        home_location: None,
        labels: HashMap::new(),
        created: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_assign_updates_assignee_and_records_call() {
        let mock = MockHcloudClient::new();
        mock.add_server(server(7, "srv-7", "10.0.0.5"));
        mock.add_floating_ip(floating_ip(1, "203.0.113.9", Some(3)));

        let action = mock.assign_floating_ip(1, 7).await.expect("assign succeeds");

        assert_eq!(action.status, ActionStatus::Success);
        assert_eq!(mock.assignee(1), Some(7));
        assert_eq!(mock.assignments(), vec![(1, 7)]);
        assert_eq!(mock.call_count(Operation::AssignFloatingIp), 1);
    }

    #[tokio::test]
    async fn test_fail_next_fails_once() {
        let mock = MockHcloudClient::new();
        mock.fail_next(Operation::ListServers, HcloudError::Authentication("bad token".to_string()));

        assert!(mock.list_servers(None).await.is_err());
        assert!(mock.list_servers(None).await.is_ok());
        assert_eq!(mock.call_count(Operation::ListServers), 2);
    }

    #[tokio::test]
    async fn test_label_selector_filters_servers() {
        let mock = MockHcloudClient::new();
        let mut labelled = server(1, "a", "10.0.0.1");
        labelled.labels.insert("k8s".to_string(), "true".to_string());
        mock.add_server(labelled);
        mock.add_server(server(2, "b", "10.0.0.2"));

        let servers = mock.list_servers(Some("k8s=true")).await.expect("list succeeds");
        assert_eq!(servers.len(), 1);
        assert_eq!(servers[0].id, 1);
    }

    #[tokio::test]
    async fn test_external_move_applies_on_get() {
        let mock = MockHcloudClient::new();
        mock.add_floating_ip(floating_ip(1, "203.0.113.9", Some(3)));
        mock.move_before_next_get(1, 9);

        let fip = mock.get_floating_ip(1).await.expect("get succeeds");
        assert_eq!(fip.server, Some(9));
    }
}
