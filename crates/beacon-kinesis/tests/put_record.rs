//! `PutRecord` calls against a local stub endpoint.

use std::convert::Infallible;
use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use beacon_auth::{Credentials, SignableRequest, SigningContext, sign};
use beacon_kinesis::{
    CONTENT_TYPE, KinesisPublisher, PUT_RECORD_TARGET, PublishError, PublishRequest,
    PublishResult, PublisherConfig,
};
use bytes::Bytes;
use chrono::{TimeZone, Utc};
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use parking_lot::Mutex;
use tokio::net::TcpListener;

const RECORD: &str = r#"{"accountId":"acme","ipAddress":"203.0.113.7","timestamp":1704110400000}"#;

#[derive(Debug, Clone)]
struct CapturedRequest {
    method: http::Method,
    path: String,
    headers: http::HeaderMap,
    body: Bytes,
}

impl CapturedRequest {
    fn header(&self, name: &str) -> &str {
        self.headers
            .get(name)
            .unwrap_or_else(|| panic!("missing header {name}"))
            .to_str()
            .unwrap()
    }
}

struct Stub {
    endpoint: String,
    captured: Arc<Mutex<Vec<CapturedRequest>>>,
}

/// Serve every request with `status` and `response_body`, recording what arrives.
async fn spawn_stub(status: u16, response_body: &'static str) -> Stub {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let captured = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&captured);

    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            let sink = Arc::clone(&sink);
            tokio::spawn(async move {
                let service = service_fn(move |req: http::Request<Incoming>| {
                    let sink = Arc::clone(&sink);
                    async move {
                        let (parts, body) = req.into_parts();
                        let body = body
                            .collect()
                            .await
                            .map(http_body_util::Collected::to_bytes)
                            .unwrap_or_default();
                        sink.lock().push(CapturedRequest {
                            method: parts.method,
                            path: parts.uri.path().to_owned(),
                            headers: parts.headers,
                            body,
                        });
                        let response = http::Response::builder()
                            .status(status)
                            .header("content-type", "application/x-amz-json-1.1")
                            .body(Full::new(Bytes::from_static(response_body.as_bytes())))
                            .unwrap();
                        Ok::<_, Infallible>(response)
                    }
                });
                let _ = hyper::server::conn::http1::Builder::new()
                    .serve_connection(TokioIo::new(stream), service)
                    .await;
            });
        }
    });

    Stub {
        endpoint: format!("http://{addr}"),
        captured,
    }
}

fn publisher_for(endpoint: &str) -> KinesisPublisher {
    KinesisPublisher::new(
        Credentials::new("AKID", "secret"),
        PublisherConfig {
            endpoint_url: Some(endpoint.to_owned()),
            ..PublisherConfig::default()
        },
    )
    .unwrap()
}

fn record_request() -> PublishRequest {
    PublishRequest {
        region: "us-east-1".to_owned(),
        stream_name: "beacon-events".to_owned(),
        partition_key: "42::beacon".to_owned(),
        data: Bytes::from_static(RECORD.as_bytes()),
    }
}

#[tokio::test]
async fn test_should_return_sequence_number_and_shard_on_success() {
    let stub = spawn_stub(200, r#"{"SequenceNumber":"123","ShardId":"shard-0"}"#).await;
    let publisher = publisher_for(&stub.endpoint);

    let result = publisher.publish(&record_request()).await.unwrap();

    assert_eq!(
        result,
        PublishResult {
            sequence_number: "123".to_owned(),
            shard_id: "shard-0".to_owned(),
        }
    );
    assert_eq!(stub.captured.lock().len(), 1);
}

#[tokio::test]
async fn test_should_send_signed_put_record_request() {
    let stub = spawn_stub(200, r#"{"SequenceNumber":"1","ShardId":"shardId-000000000000"}"#).await;
    let publisher = publisher_for(&stub.endpoint);
    let now = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();

    publisher.publish_at(&record_request(), now).await.unwrap();

    let captured = stub.captured.lock()[0].clone();
    assert_eq!(captured.method, http::Method::POST);
    assert_eq!(captured.path, "/");
    assert_eq!(captured.header("x-amz-target"), PUT_RECORD_TARGET);
    assert_eq!(captured.header("content-type"), CONTENT_TYPE);
    assert_eq!(captured.header("x-amz-date"), "20240101T120000Z");

    let authorization = captured.header("authorization");
    assert!(authorization.starts_with(
        "AWS4-HMAC-SHA256 Credential=AKID/20240101/us-east-1/kinesis/aws4_request, \
         SignedHeaders=content-type;host;x-amz-date;x-amz-target, Signature="
    ));

    // The signature must cover the exact bytes and host that arrived.
    let context =
        SigningContext::from_timestamp(captured.header("x-amz-date"), "us-east-1", "kinesis")
            .unwrap();
    let headers = [
        ("content-type", captured.header("content-type")),
        ("host", captured.header("host")),
        ("x-amz-date", captured.header("x-amz-date")),
        ("x-amz-target", captured.header("x-amz-target")),
    ];
    let expected = sign(
        &Credentials::new("AKID", "secret"),
        &context,
        &SignableRequest::new("POST", "/", &headers, &captured.body),
    )
    .unwrap();
    assert!(authorization.ends_with(&format!("Signature={}", expected.as_str())));
}

#[tokio::test]
async fn test_should_send_base64_record_in_json_body() {
    let stub = spawn_stub(200, r#"{"SequenceNumber":"1","ShardId":"shard-0"}"#).await;
    publisher_for(&stub.endpoint)
        .publish(&record_request())
        .await
        .unwrap();

    let captured = stub.captured.lock()[0].clone();
    let body: serde_json::Value = serde_json::from_slice(&captured.body).unwrap();
    assert_eq!(body["PartitionKey"], "42::beacon");
    assert_eq!(body["StreamName"], "beacon-events");
    let data = STANDARD.decode(body["Data"].as_str().unwrap()).unwrap();
    assert_eq!(data, RECORD.as_bytes());
}

#[tokio::test]
async fn test_should_carry_error_body_verbatim_without_retry() {
    let stub = spawn_stub(400, "ValidationException").await;
    let publisher = publisher_for(&stub.endpoint);

    let err = publisher.publish(&record_request()).await.unwrap_err();

    match err {
        PublishError::Service { status, body } => {
            assert_eq!(status, 400);
            assert_eq!(body, "ValidationException");
        }
        other => panic!("expected service error, got {other:?}"),
    }
    assert_eq!(stub.captured.lock().len(), 1);
}

#[tokio::test]
async fn test_should_expose_kinesis_error_type() {
    let stub = spawn_stub(
        400,
        r#"{"__type":"ResourceNotFoundException","message":"Stream beacon-events under account 123456789012 not found."}"#,
    )
    .await;

    let err = publisher_for(&stub.endpoint)
        .publish(&record_request())
        .await
        .unwrap_err();

    assert_eq!(err.error_type().as_deref(), Some("ResourceNotFoundException"));
}

#[tokio::test]
async fn test_should_reject_success_body_without_required_fields() {
    let stub = spawn_stub(200, r#"{"ShardId":"shard-0"}"#).await;

    let err = publisher_for(&stub.endpoint)
        .publish(&record_request())
        .await
        .unwrap_err();

    assert!(matches!(err, PublishError::InvalidResponse(_)));
}

#[tokio::test]
async fn test_should_report_transport_error_when_endpoint_is_down() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let err = publisher_for(&format!("http://{addr}"))
        .publish(&record_request())
        .await
        .unwrap_err();

    assert!(matches!(err, PublishError::Transport(_)));
}

#[tokio::test]
async fn test_should_sign_pinned_scope_region_in_legacy_mode() {
    let stub = spawn_stub(200, r#"{"SequenceNumber":"1","ShardId":"shard-0"}"#).await;
    let publisher = KinesisPublisher::new(
        Credentials::new("AKID", "secret"),
        PublisherConfig {
            endpoint_url: Some(stub.endpoint.clone()),
            legacy_scope_region: Some("us-east-1".to_owned()),
            ..PublisherConfig::default()
        },
    )
    .unwrap();
    let request = PublishRequest {
        region: "eu-west-1".to_owned(),
        partition_key: "42::beacon".to_owned(),
        data: Bytes::from_static(br#"{"accountId":"acme"}"#),
        ..record_request()
    };
    let now = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();

    publisher.publish_at(&request, now).await.unwrap();

    let captured = stub.captured.lock()[0].clone();
    assert_eq!(
        captured.header("authorization"),
        "AWS4-HMAC-SHA256 Credential=AKID/20240101/eu-west-1/kinesis/aws4_request, \
         SignedHeaders=content-type;host;x-amz-date;x-amz-target, \
         Signature=ace5b96dd187ac2f4dc489b730fa1e91fa715f612eb855e6664c4188ffd7efc3"
    );
}
