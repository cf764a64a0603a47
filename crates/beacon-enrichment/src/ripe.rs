//! RIPE database REST client.
//!
//! Lookups use the full-text search endpoint restricted to address-space
//! objects:
//!
//! ```text
//! GET <base>/search.json?query-string=<ip>&type-filter=inetnum&type-filter=inet6num
//!     &flags=no-referenced&flags=no-irt
//! ```
//!
//! The most specific `inetnum`/`inet6num` object is returned first; its
//! `netname` and first `descr` attribute become the [`NetworkInfo`].

use std::net::IpAddr;
use std::time::Duration;

use reqwest::header::ACCEPT;
use reqwest::{StatusCode, Url};
use serde::Deserialize;
use tracing::debug;

use crate::{EnrichmentError, NetworkInfo, NetworkRegistry};

const SEARCH_PATH: &str = "search.json";

/// [`NetworkRegistry`] backed by the RIPE database REST API.
#[derive(Debug, Clone)]
pub struct RipeClient {
    search_url: Url,
    client: reqwest::Client,
}

impl RipeClient {
    /// Create a client for the API rooted at `base_url`
    /// (e.g. `https://rest.db.ripe.net`).
    ///
    /// # Errors
    /// Returns [`EnrichmentError::InvalidEndpoint`] for an unusable base URL
    /// and [`EnrichmentError::Client`] if the HTTP client cannot be built.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, EnrichmentError> {
        let base = if base_url.ends_with('/') {
            base_url.to_owned()
        } else {
            format!("{base_url}/")
        };
        let search_url = Url::parse(&base)
            .and_then(|base| base.join(SEARCH_PATH))
            .map_err(|e| EnrichmentError::InvalidEndpoint(format!("{base_url}: {e}")))?;
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(EnrichmentError::Client)?;
        Ok(Self { search_url, client })
    }

    fn search_url_for(&self, ip: IpAddr) -> Url {
        let mut url = self.search_url.clone();
        url.query_pairs_mut()
            .append_pair("query-string", &ip.to_string())
            .append_pair("type-filter", "inetnum")
            .append_pair("type-filter", "inet6num")
            .append_pair("flags", "no-referenced")
            .append_pair("flags", "no-irt");
        url
    }
}

#[async_trait::async_trait]
impl NetworkRegistry for RipeClient {
    async fn lookup(&self, ip: IpAddr) -> Result<NetworkInfo, EnrichmentError> {
        let url = self.search_url_for(ip);
        debug!(%ip, %url, "querying RIPE database");

        let response = self
            .client
            .get(url)
            .header(ACCEPT, "application/json")
            .send()
            .await?;

        match response.status() {
            StatusCode::OK => {}
            StatusCode::NOT_FOUND => return Err(EnrichmentError::NotFound(ip)),
            status => return Err(EnrichmentError::Status(status.as_u16())),
        }

        let body = response.bytes().await?;
        parse_search_response(&body, ip)
    }
}

#[derive(Debug, Default, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    objects: Option<Objects>,
}

#[derive(Debug, Default, Deserialize)]
struct Objects {
    #[serde(default)]
    object: Vec<RipeObject>,
}

#[derive(Debug, Deserialize)]
struct RipeObject {
    #[serde(rename = "type")]
    object_type: String,
    #[serde(default)]
    attributes: Attributes,
}

#[derive(Debug, Default, Deserialize)]
struct Attributes {
    #[serde(default)]
    attribute: Vec<Attribute>,
}

#[derive(Debug, Deserialize)]
struct Attribute {
    name: String,
    #[serde(default)]
    value: String,
}

impl RipeObject {
    fn first(&self, name: &str) -> Option<&str> {
        self.attributes
            .attribute
            .iter()
            .find(|attr| attr.name == name)
            .map(|attr| attr.value.trim())
            .filter(|value| !value.is_empty())
    }
}

/// Extract the network of `ip` from a RIPE search response body.
fn parse_search_response(body: &[u8], ip: IpAddr) -> Result<NetworkInfo, EnrichmentError> {
    let response: SearchResponse = serde_json::from_slice(body)?;
    response
        .objects
        .unwrap_or_default()
        .object
        .iter()
        .filter(|object| matches!(object.object_type.as_str(), "inetnum" | "inet6num"))
        .find_map(|object| {
            object.first("netname").map(|name| NetworkInfo {
                name: name.to_owned(),
                description: object.first("descr").map(ToOwned::to_owned),
            })
        })
        .ok_or(EnrichmentError::NotFound(ip))
}
