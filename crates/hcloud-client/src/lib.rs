//! Hetzner Cloud REST API Client
//!
//! A Rust client library for the parts of the Hetzner Cloud API that a
//! floating IP controller needs: listing servers, listing and reading
//! floating IPs, and assigning a floating IP to a server.
//!
//! # Example
//!
//! ```no_run
//! use hcloud_client::HcloudClient;
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = HcloudClient::new(
//!     hcloud_client::DEFAULT_ENDPOINT.to_string(),
//!     "your-api-token".to_string(),
//!     Duration::from_secs(30),
//! )?;
//!
//! // Find the floating IP and the server it should point at
//! let floating_ips = client.list_floating_ips().await?;
//! let servers = client.list_servers(None).await?;
//!
//! if let (Some(fip), Some(server)) = (floating_ips.first(), servers.first()) {
//!     let action = client.assign_floating_ip(fip.id, server.id).await?;
//!     println!("assign action {} is {:?}", action.id, action.status);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Features
//!
//! - **Servers**: list all servers, optionally narrowed by label selector
//! - **Floating IPs**: list, get by ID, assign to a server
//! - **Pagination**: list calls follow `meta.pagination.next_page`
//! - **Mocking**: `MockHcloudClient` behind the `test-util` feature

pub mod client;
pub mod common;
pub mod error;
pub mod models;
#[path = "trait.rs"]
pub mod hcloud_trait;
#[cfg(any(test, feature = "test-util"))]
pub mod mock;

pub use client::{HcloudClient, DEFAULT_ENDPOINT};
pub use common::{HttpClient, Paginated};
pub use error::HcloudError;
pub use models::*;
pub use hcloud_trait::HcloudClientTrait;
#[cfg(any(test, feature = "test-util"))]
pub use mock::MockHcloudClient;
