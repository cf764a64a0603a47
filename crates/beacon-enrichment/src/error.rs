//! Error types for network-registry lookups.

use std::net::IpAddr;

/// Errors from a network-registry lookup.
#[derive(Debug, thiserror::Error)]
pub enum EnrichmentError {
    /// The registry base URL cannot be turned into a request URL.
    #[error("invalid registry endpoint {0:?}")]
    InvalidEndpoint(String),

    /// The HTTP client could not be constructed.
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    /// Network failure or timeout.
    #[error("registry transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The registry answered with an unexpected status.
    #[error("registry returned HTTP {0}")]
    Status(u16),

    /// The registry response is not the expected JSON.
    #[error("invalid registry response: {0}")]
    Decode(#[from] serde_json::Error),

    /// No network is registered for the address.
    #[error("no network registered for {0}")]
    NotFound(IpAddr),
}
