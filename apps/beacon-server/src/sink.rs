//! Boundary between the beacon handler and the stream publisher.

use async_trait::async_trait;
use beacon_kinesis::{KinesisPublisher, PublishError, PublishRequest, PublishResult};

/// Destination for beacon records.
///
/// Implemented by [`KinesisPublisher`]; tests substitute an in-memory sink.
#[async_trait]
pub trait RecordSink: Send + Sync {
    /// Deliver one record. Called at most once per beacon request.
    async fn put_record(&self, request: PublishRequest) -> Result<PublishResult, PublishError>;
}

#[async_trait]
impl RecordSink for KinesisPublisher {
    async fn put_record(&self, request: PublishRequest) -> Result<PublishResult, PublishError> {
        self.publish(&request).await
    }
}
