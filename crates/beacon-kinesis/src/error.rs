//! Error types for the Kinesis publisher.

use beacon_auth::SigningError;

use crate::model::KinesisErrorBody;

/// Errors surfaced by a single `PutRecord` attempt.
#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    /// The request could not be signed.
    #[error("failed to sign PutRecord request: {0}")]
    Signing(#[from] SigningError),

    /// The endpoint URL is malformed or has no host.
    #[error("invalid Kinesis endpoint {0:?}")]
    InvalidEndpoint(String),

    /// The HTTP client could not be constructed.
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    /// Network failure, timeout or unreadable response body.
    #[error("Kinesis transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The service answered with a non-200 status.
    #[error("Kinesis returned HTTP {status}: {body}")]
    Service {
        /// HTTP status code.
        status: u16,
        /// Response body, verbatim.
        body: String,
    },

    /// A 200 response did not carry `SequenceNumber` and `ShardId`.
    #[error("invalid PutRecord response: {0}")]
    InvalidResponse(#[from] serde_json::Error),
}

impl PublishError {
    /// The AWS error type (`__type`) of a service error, if the body carries one.
    ///
    /// Kinesis reports e.g. `ResourceNotFoundException`; older endpoints send
    /// a fully qualified `namespace#Name`, which is shortened to `Name`.
    #[must_use]
    pub fn error_type(&self) -> Option<String> {
        let Self::Service { body, .. } = self else {
            return None;
        };
        let parsed: KinesisErrorBody = serde_json::from_str(body).ok()?;
        let raw = parsed.error_type?;
        let short = raw.rsplit_once('#').map_or(raw.as_str(), |(_, name)| name);
        Some(short.to_owned())
    }
}
