//! Network-registry enrichment for analytics beacon records.
//!
//! A [`NetworkRegistry`] resolves an IP address to the name and description
//! of the network it belongs to. [`RipeClient`] implements it on top of the
//! RIPE database REST API. Lookups are best effort: callers treat every
//! [`EnrichmentError`] as "no enrichment available".

mod error;
mod ripe;

use std::net::IpAddr;

pub use error::EnrichmentError;
pub use ripe::RipeClient;

/// Network ownership information for an IP address.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct NetworkInfo {
    /// Registry network name (`netname`).
    pub name: String,
    /// First description line (`descr`), if the registry has one.
    pub description: Option<String>,
}

/// Resolves IP addresses to network information.
///
/// The trait is object-safe so the front end can hold an
/// `Arc<dyn NetworkRegistry>` and swap the implementation in tests.
#[async_trait::async_trait]
pub trait NetworkRegistry: Send + Sync {
    /// Look up the network `ip` belongs to.
    ///
    /// # Errors
    /// Returns an [`EnrichmentError`] on transport failure, unexpected
    /// registry responses, or when no network is registered for `ip`.
    async fn lookup(&self, ip: IpAddr) -> Result<NetworkInfo, EnrichmentError>;
}
