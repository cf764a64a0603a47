//! Kinesis `PutRecord` publisher.
//!
//! Each call moves through `Signing -> Sending -> {Success | Failed}` and
//! terminates; there is no retry transition.

use std::fmt;
use std::time::Duration;

use beacon_auth::{Credentials, SignableRequest, SigningContext, sign};
use chrono::{DateTime, Utc};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE as CONTENT_TYPE_HEADER};
use reqwest::{StatusCode, Url};
use tracing::{debug, warn};

use crate::error::PublishError;
use crate::model::{PublishRequest, PublishResult, PutRecordInput};
use crate::{CONTENT_TYPE, PUT_RECORD_TARGET, SERVICE_NAME, kinesis_host};

/// Publisher settings.
#[derive(Debug, Clone)]
pub struct PublisherConfig {
    /// Endpoint used instead of `https://kinesis.<region>.amazonaws.com`.
    pub endpoint_url: Option<String>,
    /// Upper bound on one `PutRecord` call, connect through body.
    pub timeout: Duration,
    /// Sign the scope and `host` header for this region regardless of the
    /// target region. Reproduces the historical beacon signatures.
    pub legacy_scope_region: Option<String>,
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self {
            endpoint_url: None,
            timeout: Duration::from_secs(5),
            legacy_scope_region: None,
        }
    }
}

/// Publishes single records to Kinesis with SigV4-signed `PutRecord` calls.
///
/// Cheap to share behind an `Arc`; holds only immutable state.
pub struct KinesisPublisher {
    credentials: Credentials,
    config: PublisherConfig,
    client: reqwest::Client,
}

impl fmt::Debug for KinesisPublisher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KinesisPublisher")
            .field("credentials", &self.credentials)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl KinesisPublisher {
    /// Create a publisher.
    ///
    /// Idle connections are never kept, so every call opens its own
    /// connection.
    ///
    /// # Errors
    /// Returns [`PublishError::Client`] if the HTTP client cannot be built.
    pub fn new(credentials: Credentials, config: PublisherConfig) -> Result<Self, PublishError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .pool_max_idle_per_host(0)
            .build()
            .map_err(PublishError::Client)?;
        Ok(Self {
            credentials,
            config,
            client,
        })
    }

    /// The endpoint a request for `region` is sent to.
    #[must_use]
    pub fn endpoint_for(&self, region: &str) -> String {
        self.config
            .endpoint_url
            .clone()
            .unwrap_or_else(|| format!("https://{}", kinesis_host(region)))
    }

    /// Publish one record.
    ///
    /// The current time is captured once and used for both the credential
    /// date and `X-Amz-Date`.
    ///
    /// # Errors
    /// Returns a [`PublishError`] if signing fails, the call fails at the
    /// transport level, Kinesis answers with a non-200 status, or the
    /// success body cannot be parsed.
    pub async fn publish(&self, request: &PublishRequest) -> Result<PublishResult, PublishError> {
        self.publish_at(request, Utc::now()).await
    }

    /// Publish one record, signing it for `now`.
    ///
    /// # Errors
    /// Same as [`KinesisPublisher::publish`].
    pub async fn publish_at(
        &self,
        request: &PublishRequest,
        now: DateTime<Utc>,
    ) -> Result<PublishResult, PublishError> {
        let payload = PutRecordInput::from_request(request).to_payload()?;

        let endpoint = self.endpoint_for(&request.region);
        let url = Url::parse(&endpoint)
            .map_err(|e| PublishError::InvalidEndpoint(format!("{endpoint}: {e}")))?;
        let signed_host = match self.config.legacy_scope_region.as_deref() {
            Some(scope_region) => kinesis_host(scope_region),
            None => host_header_value(&url)
                .ok_or_else(|| PublishError::InvalidEndpoint(endpoint.clone()))?,
        };

        let mut context = SigningContext::new(now, &request.region, SERVICE_NAME);
        if let Some(scope_region) = self.config.legacy_scope_region.as_deref() {
            context = context.with_scope_region(scope_region);
        }

        debug!(
            stream = %request.stream_name,
            region = %request.region,
            partition_key = %request.partition_key,
            "signing PutRecord request"
        );
        let headers = [
            ("content-type", CONTENT_TYPE),
            ("host", signed_host.as_str()),
            ("x-amz-date", context.timestamp()),
            ("x-amz-target", PUT_RECORD_TARGET),
        ];
        let signable = SignableRequest::new("POST", url.path(), &headers, &payload);
        let signature = sign(&self.credentials, &context, &signable)?;
        let authorization = signature.authorization_header(self.credentials.access_key());

        debug!(%url, bytes = payload.len(), "sending PutRecord request");
        let response = self
            .client
            .post(url)
            .header(AUTHORIZATION, authorization)
            .header("X-Amz-Target", PUT_RECORD_TARGET)
            .header("X-Amz-Date", context.timestamp())
            .header(CONTENT_TYPE_HEADER, CONTENT_TYPE)
            .body(payload)
            .send()
            .await?;

        let status = response.status();
        let body = response.bytes().await?;

        if status != StatusCode::OK {
            let body = String::from_utf8_lossy(&body).into_owned();
            warn!(status = status.as_u16(), body = %body, "PutRecord rejected");
            return Err(PublishError::Service {
                status: status.as_u16(),
                body,
            });
        }

        let result: PublishResult = serde_json::from_slice(&body)?;
        debug!(
            sequence_number = %result.sequence_number,
            shard_id = %result.shard_id,
            "PutRecord succeeded"
        );
        Ok(result)
    }
}

/// The `Host` header value the HTTP client sends for `url`.
///
/// The port is included only when it differs from the scheme default.
fn host_header_value(url: &Url) -> Option<String> {
    let host = url.host_str()?;
    Some(match url.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_owned(),
    })
}
