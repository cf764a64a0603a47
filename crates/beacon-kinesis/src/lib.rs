//! Signed Kinesis `PutRecord` publisher for the analytics beacon.
//!
//! [`KinesisPublisher`] performs exactly one SigV4-signed `PutRecord` call per
//! [`KinesisPublisher::publish`] invocation and maps the HTTP outcome to a
//! [`PublishResult`] or a [`PublishError`]. There is no retry, batching or
//! connection reuse.
//!
//! # Modules
//!
//! - [`error`] - Publish error types
//! - [`model`] - `PutRecord` request/response wire shapes
//! - [`publisher`] - The HTTP publisher

pub mod error;
pub mod model;
pub mod publisher;

pub use error::PublishError;
pub use model::{PublishRequest, PublishResult};
pub use publisher::{KinesisPublisher, PublisherConfig};

/// Signing name of the service.
pub const SERVICE_NAME: &str = "kinesis";

/// `X-Amz-Target` value for `PutRecord`.
pub const PUT_RECORD_TARGET: &str = "Kinesis_20131202.PutRecord";

/// Content type of Kinesis JSON requests.
pub const CONTENT_TYPE: &str = "application/x-amz-json-1.1; charset=UTF-8";

/// Hostname of the Kinesis endpoint for `region`.
///
/// # Examples
///
/// ```
/// assert_eq!(beacon_kinesis::kinesis_host("eu-west-1"), "kinesis.eu-west-1.amazonaws.com");
/// ```
#[must_use]
pub fn kinesis_host(region: &str) -> String {
    format!("{SERVICE_NAME}.{region}.amazonaws.com")
}
