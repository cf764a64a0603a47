//! AWS Signature Version 4 request signing for the analytics beacon.
//!
//! This crate implements the client side of SigV4: given long-lived
//! credentials, a signing instant, a region and the exact request that will
//! be sent, it produces the hex signature and the `Authorization` header
//! value. Everything here is pure computation; no I/O is performed.
//!
//! # Usage
//!
//! ```rust
//! use beacon_auth::{Credentials, SignableRequest, SigningContext, sign};
//! use chrono::{TimeZone, Utc};
//!
//! let credentials = Credentials::new("AKIDEXAMPLE", "secret");
//! let now = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
//! let context = SigningContext::new(now, "us-east-1", "kinesis");
//! let headers = [
//!     ("host", "kinesis.us-east-1.amazonaws.com"),
//!     ("x-amz-date", context.timestamp()),
//! ];
//! let request = SignableRequest::new("POST", "/", &headers, b"{}");
//!
//! let signature = sign(&credentials, &context, &request).unwrap();
//! assert_eq!(signature.as_str().len(), 64);
//! ```
//!
//! # Modules
//!
//! - [`canonical`] - Canonical request construction
//! - [`credentials`] - Access key / secret key pair
//! - [`error`] - Signing error types
//! - [`sigv4`] - String to sign, key derivation and signature computation

pub mod canonical;
pub mod credentials;
pub mod error;
pub mod sigv4;

pub use credentials::Credentials;
pub use error::SigningError;
pub use sigv4::{Signature, SignableRequest, SigningContext, hash_payload, sign};
