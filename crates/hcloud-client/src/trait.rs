//! HcloudClient trait for mocking
//!
//! This trait abstracts the HcloudClient so the controller can be driven by
//! a mock implementation in unit tests.

use crate::error::HcloudError;
use crate::models::*;

/// Trait for Hetzner Cloud API client operations
///
/// All async methods must be `Send` to work with Tokio's work-stealing runtime.
#[async_trait::async_trait]
pub trait HcloudClientTrait: Send + Sync {
    /// Validate the API token
    async fn validate_token(&self) -> Result<(), HcloudError>;

    // Servers
    async fn list_servers(&self, label_selector: Option<&str>) -> Result<Vec<Server>, HcloudError>;

    // Floating IPs
    async fn list_floating_ips(&self) -> Result<Vec<FloatingIp>, HcloudError>;
    async fn get_floating_ip(&self, id: u64) -> Result<FloatingIp, HcloudError>;
    async fn assign_floating_ip(&self, floating_ip_id: u64, server_id: u64) -> Result<Action, HcloudError>;
}
