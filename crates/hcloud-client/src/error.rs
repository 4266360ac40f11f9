//! Hetzner Cloud client errors

use thiserror::Error;

/// Errors that can occur when interacting with the Hetzner Cloud API
#[derive(Debug, Error)]
pub enum HcloudError {
    /// HTTP request/response error (connect, timeout, body read)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Hetzner Cloud API returned an error envelope or unexpected status
    #[error("Hetzner Cloud API error ({code}): {message}")]
    Api {
        /// Machine-readable error code, e.g. `rate_limit_exceeded`
        code: String,
        /// Human-readable message
        message: String,
    },

    /// JSON serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Authentication failed (invalid or revoked token)
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid request (e.g., malformed base URL)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl HcloudError {
    /// Whether the error came from talking to the API rather than from
    /// the API telling us a resource is missing or the token is bad.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            HcloudError::Http(_) | HcloudError::Serialization(_) => true,
            HcloudError::Api { code, .. } => matches!(
                code.as_str(),
                "rate_limit_exceeded"
                    | "conflict"
                    | "locked"
                    | "service_error"
                    | "timeout"
                    | "server_error"
                    | "maintenance"
                    | "unavailable"
                    | "resource_unavailable"
            ),
            HcloudError::Authentication(_) | HcloudError::NotFound(_) | HcloudError::InvalidRequest(_) => false,
        }
    }
}
