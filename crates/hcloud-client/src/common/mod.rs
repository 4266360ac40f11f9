//! Common utilities for the Hetzner Cloud API client
//!
//! Provides the authenticated HTTP wrapper, error mapping and pagination
//! shared by all endpoints.

use crate::error::HcloudError;
use crate::models::{ErrorResponse, FloatingIp, FloatingIpsResponse, Server, ServersResponse};
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::fmt;
use tracing::debug;

/// Page size requested on list endpoints (API maximum)
pub const PER_PAGE: u64 = 50;

/// A list response that carries one page of items and a pointer to the next page
pub trait Paginated: DeserializeOwned {
    /// Item type of the list
    type Item;

    /// Split the response into its items and the next page number, if any
    fn into_page(self) -> (Vec<Self::Item>, Option<u64>);
}

impl Paginated for ServersResponse {
    type Item = Server;

    fn into_page(self) -> (Vec<Server>, Option<u64>) {
        let next = self.meta.pagination.and_then(|p| p.next_page);
        (self.servers, next)
    }
}

impl Paginated for FloatingIpsResponse {
    type Item = FloatingIp;

    fn into_page(self) -> (Vec<FloatingIp>, Option<u64>) {
        let next = self.meta.pagination.and_then(|p| p.next_page);
        (self.floating_ips, next)
    }
}

/// HTTP client wrapper with bearer authentication
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    base_url: String,
    token: String,
}

impl fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpClient")
            .field("client", &self.client)
            .field("base_url", &self.base_url)
            .field("token", &"<redacted>")
            .finish()
    }
}

impl HttpClient {
    /// Create a new HTTP client wrapper
    pub fn new(client: Client, base_url: String, token: String) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        }
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Build a full URL from an API path
    pub fn build_url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Get authorization header value
    pub fn auth_header(&self) -> String {
        format!("Bearer {}", self.token)
    }

    /// Turn a non-success response into the matching error.
    ///
    /// The API answers errors with `{"error": {"code", "message"}}`; bodies
    /// that do not decode fall back to the raw status and text.
    pub async fn error_for_response(&self, context: &str, response: Response) -> HcloudError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let decoded = serde_json::from_str::<ErrorResponse>(&body).ok();

        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => HcloudError::Authentication(format!(
                "{}: {} - {}",
                context,
                status,
                decoded.map(|e| e.error.message).unwrap_or(body)
            )),
            StatusCode::NOT_FOUND => HcloudError::NotFound(context.to_string()),
            _ => match decoded {
                Some(envelope) => HcloudError::Api {
                    code: envelope.error.code,
                    message: format!("{}: {}", context, envelope.error.message),
                },
                None => HcloudError::Api {
                    code: if status.is_server_error() { "server_error" } else { "unexpected_status" }.to_string(),
                    message: format!("{}: {} - {}", context, status, body),
                },
            },
        }
    }

    /// Make a GET request
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, HcloudError> {
        let url = self.build_url(path);
        debug!("GET {}", url);

        let response = self.client
            .get(&url)
            .header("Authorization", self.auth_header())
            .header("Accept", "application/json")
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(self.error_for_response(&format!("GET {}", path), response).await);
        }

        let text = response.text().await?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Make a POST request
    pub async fn post<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> Result<T, HcloudError> {
        let url = self.build_url(path);
        debug!("POST {} with body: {}", url, body);

        let response = self.client
            .post(&url)
            .header("Authorization", self.auth_header())
            .header("Accept", "application/json")
            .json(body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(self.error_for_response(&format!("POST {}", path), response).await);
        }

        let text = response.text().await?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Fetch every page of a list endpoint.
    ///
    /// `filters` are appended to each page request along with `page` and `per_page`.
    pub async fn fetch_all_pages<P: Paginated>(
        &self,
        path: &str,
        filters: &[(&str, &str)],
    ) -> Result<Vec<P::Item>, HcloudError> {
        let mut all_results = Vec::new();
        let mut page = 1u64;

        loop {
            let per_page = PER_PAGE.to_string();
            let page_str = page.to_string();
            let mut params: Vec<(&str, &str)> = filters.to_vec();
            params.push(("page", &page_str));
            params.push(("per_page", &per_page));

            let url = format!("{}?{}", path, self.build_query_string(&params));
            let response: P = self.get(&url).await?;
            let (items, next) = response.into_page();
            debug!("Fetched page {} of {} ({} items)", page, path, items.len());
            all_results.extend(items);

            match next {
                Some(next_page) if next_page > page => page = next_page,
                _ => break,
            }
        }

        Ok(all_results)
    }

    /// Build query string from filters
    pub fn build_query_string(&self, filters: &[(&str, &str)]) -> String {
        filters
            .iter()
            .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&")
    }
}
