//! Hetzner Cloud API client
//!
//! Implements the REST calls for servers and floating IPs.
//! Based on the Hetzner Cloud API structure: /v1/servers and /v1/floating_ips

use crate::common::HttpClient;
use crate::error::HcloudError;
use crate::hcloud_trait::HcloudClientTrait;
use crate::models::*;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

/// Public Hetzner Cloud API endpoint
pub const DEFAULT_ENDPOINT: &str = "https://api.hetzner.cloud/v1";

/// Hetzner Cloud API client
#[derive(Debug, Clone)]
pub struct HcloudClient {
    http: HttpClient,
}

impl HcloudClient {
    /// Create a new Hetzner Cloud client
    ///
    /// # Arguments
    /// * `base_url` - API base URL (usually [`DEFAULT_ENDPOINT`])
    /// * `token` - API token for authentication
    /// * `timeout` - Per-request timeout
    pub fn new(base_url: String, token: String, timeout: Duration) -> Result<Self, HcloudError> {
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(HcloudError::InvalidRequest(format!(
                "Base URL must start with http:// or https://, got {}",
                base_url
            )));
        }
        if token.trim().is_empty() {
            return Err(HcloudError::InvalidRequest("API token must not be empty".to_string()));
        }

        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("hcloud-fip/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http: HttpClient::new(client, base_url, token),
        })
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        self.http.base_url()
    }

    /// Validate the API token by making a minimal authenticated request.
    ///
    /// # Returns
    /// * `Ok(())` - Token is valid and the API is reachable
    /// * `Err(HcloudError)` - Token is invalid or the API is unreachable
    pub async fn validate_token(&self) -> Result<(), HcloudError> {
        debug!("Validating Hetzner Cloud token and connectivity");
        let _: FloatingIpsResponse = self.http.get("/floating_ips?per_page=1").await?;
        debug!("Token validated successfully");
        Ok(())
    }

    /// List all servers in the project
    ///
    /// # Arguments
    /// * `label_selector` - Optional label selector, e.g. `"k8s-node=true"`
    pub async fn list_servers(&self, label_selector: Option<&str>) -> Result<Vec<Server>, HcloudError> {
        debug!("Listing servers (label selector: {:?})", label_selector);
        let filters: Vec<(&str, &str)> = label_selector
            .map(|selector| vec![("label_selector", selector)])
            .unwrap_or_default();
        self.http.fetch_all_pages::<ServersResponse>("/servers", &filters).await
    }

    /// List all floating IPs in the project
    pub async fn list_floating_ips(&self) -> Result<Vec<FloatingIp>, HcloudError> {
        debug!("Listing floating IPs");
        self.http.fetch_all_pages::<FloatingIpsResponse>("/floating_ips", &[]).await
    }

    /// Get a floating IP by ID
    ///
    /// # Returns
    /// * `Ok(FloatingIp)` - The floating IP
    /// * `Err(HcloudError::NotFound)` - If no floating IP has this ID
    pub async fn get_floating_ip(&self, id: u64) -> Result<FloatingIp, HcloudError> {
        debug!("Fetching floating IP {}", id);
        let response: FloatingIpResponse = self.http.get(&format!("/floating_ips/{}", id)).await?;
        Ok(response.floating_ip)
    }

    /// Assign a floating IP to a server
    ///
    /// Returns the action the API created. An action that is already in the
    /// `error` state is returned as [`HcloudError::Api`] so callers never have
    /// to inspect the action to detect failure.
    pub async fn assign_floating_ip(&self, floating_ip_id: u64, server_id: u64) -> Result<Action, HcloudError> {
        debug!("Assigning floating IP {} to server {}", floating_ip_id, server_id);
        let body = serde_json::to_value(AssignFloatingIpRequest { server: server_id })?;
        let response: ActionResponse = self.http
            .post(&format!("/floating_ips/{}/actions/assign", floating_ip_id), &body)
            .await?;

        let action = response.action;
        if action.status == ActionStatus::Error {
            let (code, message) = action
                .error
                .map(|e| (e.code, e.message))
                .unwrap_or_else(|| ("action_failed".to_string(), "assign action failed".to_string()));
            return Err(HcloudError::Api { code, message });
        }

        Ok(action)
    }
}

#[async_trait::async_trait]
impl HcloudClientTrait for HcloudClient {
    async fn validate_token(&self) -> Result<(), HcloudError> {
        self.validate_token().await
    }

    async fn list_servers(&self, label_selector: Option<&str>) -> Result<Vec<Server>, HcloudError> {
        self.list_servers(label_selector).await
    }

    async fn list_floating_ips(&self) -> Result<Vec<FloatingIp>, HcloudError> {
        self.list_floating_ips().await
    }

    async fn get_floating_ip(&self, id: u64) -> Result<FloatingIp, HcloudError> {
        self.get_floating_ip(id).await
    }

    async fn assign_floating_ip(&self, floating_ip_id: u64, server_id: u64) -> Result<Action, HcloudError> {
        self.assign_floating_ip(floating_ip_id, server_id).await
    }
}
