//! `PutRecord` wire shapes.
//!
//! Kinesis speaks the AWS JSON 1.1 protocol: PascalCase member names in
//! request and response bodies, `__type` plus `message` in error bodies.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// One record to publish.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishRequest {
    /// Target region; selects the endpoint and the credential scope.
    pub region: String,
    /// Kinesis stream name.
    pub stream_name: String,
    /// Partition key used by Kinesis to pick a shard.
    pub partition_key: String,
    /// Raw record bytes. Base64-encoded on the wire.
    pub data: Bytes,
}

/// Outcome of a successful `PutRecord`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PublishResult {
    /// Sequence number assigned to the record.
    pub sequence_number: String,
    /// Shard the record was written to.
    pub shard_id: String,
}

/// JSON body of a `PutRecord` call. Field order is the wire order.
#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct PutRecordInput<'a> {
    /// Partition key.
    pub partition_key: &'a str,
    /// Stream name.
    pub stream_name: &'a str,
    /// Base64 of the record bytes.
    pub data: String,
}

impl<'a> PutRecordInput<'a> {
    /// Build the body for `request`, base64-encoding its data.
    #[must_use]
    pub fn from_request(request: &'a PublishRequest) -> Self {
        Self {
            partition_key: &request.partition_key,
            stream_name: &request.stream_name,
            data: STANDARD.encode(&request.data),
        }
    }

    /// Serialize to the exact bytes that are signed and sent.
    ///
    /// # Errors
    /// Returns a [`serde_json::Error`] if serialization fails.
    pub fn to_payload(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }
}

/// Error body returned by Kinesis.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct KinesisErrorBody {
    /// Error type, e.g. `ResourceNotFoundException`.
    #[serde(rename = "__type")]
    pub error_type: Option<String>,
    /// Human-readable message.
    #[serde(alias = "Message")]
    pub message: Option<String>,
}
