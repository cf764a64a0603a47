//! Beacon request handling.
//!
//! Every `GET` is a beacon hit: the request metadata is captured, enriched,
//! published and answered with the stylesheet. Publishing problems are logged
//! and never reach the caller.

use std::net::SocketAddr;
use std::sync::Arc;

use beacon_kinesis::PublishRequest;
use bytes::Bytes;
use chrono::Utc;
use http::header::{ALLOW, CONTENT_TYPE};
use http::{HeaderValue, Method, Response, StatusCode};
use http_body_util::Full;
use tracing::{debug, error, info, warn};

use crate::record::{EventRecord, new_partition_key};
use crate::state::BeaconState;

/// Path answered with the JSON health status.
pub const HEALTH_PATH: &str = "/health";

/// Response body type of the beacon server.
pub type BeaconBody = Full<Bytes>;

/// Handles beacon requests against an immutable [`BeaconState`].
#[derive(Debug, Clone)]
pub struct BeaconHandler {
    state: Arc<BeaconState>,
}

impl BeaconHandler {
    /// Create a handler over shared state.
    #[must_use]
    pub fn new(state: Arc<BeaconState>) -> Self {
        Self { state }
    }

    /// Handle one request. Never fails: every beacon hit is answered with the
    /// stylesheet.
    pub async fn handle(
        &self,
        parts: &http::request::Parts,
        remote: SocketAddr,
    ) -> Response<BeaconBody> {
        if parts.method == Method::GET && parts.uri.path() == HEALTH_PATH {
            return self.health_response();
        }
        if parts.method != Method::GET {
            debug!(method = %parts.method, "rejecting non-GET request");
            return method_not_allowed();
        }

        let mut record =
            EventRecord::capture(parts, remote.ip(), &self.state.account_param, Utc::now());

        if let Some(registry) = &self.state.registry {
            let ip = remote.ip().to_canonical();
            match registry.lookup(ip).await {
                Ok(network) => record.network = Some(network),
                Err(e) => warn!(%ip, error = %e, "network enrichment failed"),
            }
        }

        self.publish(&record).await;
        self.stylesheet_response()
    }

    async fn publish(&self, record: &EventRecord) {
        let Some(target) = &self.state.target else {
            debug!("publishing disabled, dropping beacon record");
            return;
        };

        let data = match record.to_json() {
            Ok(data) => data,
            Err(e) => {
                error!(error = %e, "failed to serialize beacon record");
                return;
            }
        };

        let request = PublishRequest {
            region: target.region.clone(),
            stream_name: target.stream_name.clone(),
            partition_key: new_partition_key(),
            data: Bytes::from(data),
        };
        let partition_key = request.partition_key.clone();

        match target.sink.put_record(request).await {
            Ok(result) => info!(
                stream = %target.stream_name,
                %partition_key,
                sequence_number = %result.sequence_number,
                shard_id = %result.shard_id,
                "published beacon record"
            ),
            Err(e) => {
                let error_type = e.error_type().unwrap_or_default();
                error!(
                    stream = %target.stream_name,
                    %partition_key,
                    %error_type,
                    error = %e,
                    "failed to publish beacon record"
                );
            }
        }
    }

    fn stylesheet_response(&self) -> Response<BeaconBody> {
        let mut resp = Response::new(Full::new(self.state.stylesheet.clone()));
        resp.headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static("text/css"));
        resp
    }

    fn health_response(&self) -> Response<BeaconBody> {
        let publisher = if self.state.target.is_some() {
            "ready"
        } else {
            "disabled"
        };
        let body = serde_json::json!({ "status": "running", "publisher": publisher });
        let mut resp = Response::new(Full::new(Bytes::from(body.to_string())));
        resp.headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        resp
    }
}

fn method_not_allowed() -> Response<BeaconBody> {
    let mut resp = Response::new(Full::new(Bytes::new()));
    *resp.status_mut() = StatusCode::METHOD_NOT_ALLOWED;
    resp.headers_mut()
        .insert(ALLOW, HeaderValue::from_static("GET"));
    resp
}
