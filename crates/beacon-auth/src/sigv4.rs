//! AWS Signature Version 4 signing.
//!
//! Signing a request runs the following steps:
//!
//! 1. Build the canonical request from the method, path, headers and the
//!    exact payload bytes.
//! 2. Build the string to sign from the timestamp, the credential scope and
//!    the hash of the canonical request.
//! 3. Derive the signing key through the four-step HMAC-SHA256 chain.
//! 4. HMAC the string to sign with the signing key and hex-encode it.
//!
//! The main entry point is [`sign`].

use std::fmt;

use chrono::{DateTime, NaiveDateTime, Utc};
use hmac::{Hmac, KeyInit, Mac};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::canonical::{build_canonical_request, build_signed_headers_string};
use crate::credentials::Credentials;
use crate::error::SigningError;

/// The only algorithm produced by this implementation.
pub const ALGORITHM: &str = "AWS4-HMAC-SHA256";

/// Terminator of every credential scope.
const SCOPE_TERMINATOR: &str = "aws4_request";

const DATESTAMP_FORMAT: &str = "%Y%m%d";
const TIMESTAMP_FORMAT: &str = "%Y%m%dT%H%M%SZ";

type HmacSha256 = Hmac<Sha256>;

/// Time, region and service a signature is bound to.
///
/// Both stamps are rendered from a single instant so the credential date
/// and the `X-Amz-Date` header can never disagree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SigningContext {
    datestamp: String,
    timestamp: String,
    region: String,
    scope_region: String,
    service: String,
}

impl SigningContext {
    /// Create a context for `now`, with the scope bound to `region`.
    #[must_use]
    pub fn new(now: DateTime<Utc>, region: &str, service: &str) -> Self {
        Self {
            datestamp: now.format(DATESTAMP_FORMAT).to_string(),
            timestamp: now.format(TIMESTAMP_FORMAT).to_string(),
            region: region.to_owned(),
            scope_region: region.to_owned(),
            service: service.to_owned(),
        }
    }

    /// Recreate a context from an `X-Amz-Date` value.
    ///
    /// # Errors
    /// Returns [`SigningError::InvalidTimestamp`] if the value is not in
    /// `YYYYMMDD'T'HHMMSS'Z'` form.
    pub fn from_timestamp(timestamp: &str, region: &str, service: &str) -> Result<Self, SigningError> {
        let naive = NaiveDateTime::parse_from_str(timestamp, TIMESTAMP_FORMAT)
            .map_err(|_| SigningError::InvalidTimestamp(timestamp.to_owned()))?;
        Ok(Self::new(naive.and_utc(), region, service))
    }

    /// Use `scope_region` in the string to sign instead of the target region.
    ///
    /// The `Credential=` component of the `Authorization` header and the
    /// signing key keep using the target region.
    #[must_use]
    pub fn with_scope_region(mut self, scope_region: &str) -> Self {
        scope_region.clone_into(&mut self.scope_region);
        self
    }

    /// `YYYYMMDD`.
    #[must_use]
    pub fn datestamp(&self) -> &str {
        &self.datestamp
    }

    /// `YYYYMMDD'T'HHMMSS'Z'`, the `X-Amz-Date` header value.
    #[must_use]
    pub fn timestamp(&self) -> &str {
        &self.timestamp
    }

    /// Target region.
    #[must_use]
    pub fn region(&self) -> &str {
        &self.region
    }

    /// Region embedded in the string to sign.
    #[must_use]
    pub fn scope_region(&self) -> &str {
        &self.scope_region
    }

    /// Service name, e.g. `kinesis`.
    #[must_use]
    pub fn service(&self) -> &str {
        &self.service
    }

    /// `datestamp/scope_region/service/aws4_request`, as used in the string to sign.
    #[must_use]
    pub fn credential_scope(&self) -> String {
        format!(
            "{}/{}/{}/{SCOPE_TERMINATOR}",
            self.datestamp, self.scope_region, self.service
        )
    }
}

/// The parts of an outgoing HTTP request that take part in the signature.
#[derive(Debug, Clone, Copy)]
pub struct SignableRequest<'a> {
    method: &'a str,
    path: &'a str,
    headers: &'a [(&'a str, &'a str)],
    payload: &'a [u8],
}

impl<'a> SignableRequest<'a> {
    /// Describe a request. Every header in `headers` is signed.
    #[must_use]
    pub fn new(
        method: &'a str,
        path: &'a str,
        headers: &'a [(&'a str, &'a str)],
        payload: &'a [u8],
    ) -> Self {
        Self {
            method,
            path,
            headers,
            payload,
        }
    }

    /// Canonical request for this request.
    #[must_use]
    pub fn canonical_request(&self) -> String {
        build_canonical_request(self.method, self.path, self.headers, self.payload)
    }
}

/// A computed request signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    signature: String,
    signed_headers: String,
    credential_scope: String,
}

impl Signature {
    /// The hex-encoded signature.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.signature
    }

    /// Semicolon-separated signed header names.
    #[must_use]
    pub fn signed_headers(&self) -> &str {
        &self.signed_headers
    }

    /// Render the `Authorization` header value.
    ///
    /// ```text
    /// AWS4-HMAC-SHA256 Credential=AKID/20240101/us-east-1/kinesis/aws4_request,
    ///   SignedHeaders=content-type;host;x-amz-date;x-amz-target, Signature=<hex>
    /// ```
    #[must_use]
    pub fn authorization_header(&self, access_key: &str) -> String {
        format!(
            "{ALGORITHM} Credential={access_key}/{}, SignedHeaders={}, Signature={}",
            self.credential_scope, self.signed_headers, self.signature
        )
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.signature)
    }
}

/// The four intermediate keys of the SigV4 derivation.
#[derive(Clone)]
pub struct SignatureChain {
    /// `HMAC("AWS4" + secret, date)`.
    pub date_key: Vec<u8>,
    /// `HMAC(date_key, region)`.
    pub date_region_key: Vec<u8>,
    /// `HMAC(date_region_key, service)`.
    pub date_region_service_key: Vec<u8>,
    /// `HMAC(date_region_service_key, "aws4_request")`.
    pub signing_key: Vec<u8>,
}

impl fmt::Debug for SignatureChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignatureChain").finish_non_exhaustive()
    }
}

/// Build the SigV4 string to sign.
///
/// # Examples
///
/// ```
/// use beacon_auth::sigv4::build_string_to_sign;
///
/// let sts = build_string_to_sign(
///     "20130524T000000Z",
///     "20130524/us-east-1/s3/aws4_request",
///     "7344ae5b7ee6c3e7e6b0fe0640412a37625d1fbfff95c48bbb2dc43964946972",
/// );
/// assert!(sts.starts_with("AWS4-HMAC-SHA256\n20130524T000000Z\n"));
/// ```
#[must_use]
pub fn build_string_to_sign(
    timestamp: &str,
    credential_scope: &str,
    canonical_request_hash: &str,
) -> String {
    format!("{ALGORITHM}\n{timestamp}\n{credential_scope}\n{canonical_request_hash}")
}

/// Run the HMAC-SHA256 derivation and keep every intermediate key.
///
/// Each step keys the HMAC with the raw bytes of the previous step.
///
/// # Errors
/// Returns [`SigningError::InvalidKey`] if the HMAC rejects a key.
pub fn derive_signature_chain(
    secret_key: &str,
    date: &str,
    region: &str,
    service: &str,
) -> Result<SignatureChain, SigningError> {
    let date_key = hmac_sha256(format!("AWS4{secret_key}").as_bytes(), date.as_bytes())?;
    let date_region_key = hmac_sha256(&date_key, region.as_bytes())?;
    let date_region_service_key = hmac_sha256(&date_region_key, service.as_bytes())?;
    let signing_key = hmac_sha256(&date_region_service_key, SCOPE_TERMINATOR.as_bytes())?;
    Ok(SignatureChain {
        date_key,
        date_region_key,
        date_region_service_key,
        signing_key,
    })
}

/// Derive the SigV4 signing key.
///
/// ```text
/// DateKey              = HMAC-SHA256("AWS4" + secret_key, date)
/// DateRegionKey        = HMAC-SHA256(DateKey, region)
/// DateRegionServiceKey = HMAC-SHA256(DateRegionKey, service)
/// SigningKey           = HMAC-SHA256(DateRegionServiceKey, "aws4_request")
/// ```
///
/// # Errors
/// Returns [`SigningError::InvalidKey`] if the HMAC rejects a key.
pub fn derive_signing_key(
    secret_key: &str,
    date: &str,
    region: &str,
    service: &str,
) -> Result<Vec<u8>, SigningError> {
    derive_signature_chain(secret_key, date, region, service).map(|chain| chain.signing_key)
}

/// HMAC `data` with `signing_key` and hex-encode the result.
///
/// # Errors
/// Returns [`SigningError::InvalidKey`] if the HMAC rejects the key.
pub fn compute_signature(signing_key: &[u8], data: &str) -> Result<String, SigningError> {
    hmac_sha256(signing_key, data.as_bytes()).map(hex::encode)
}

/// Sign `request` with `credentials` for the time, region and service in `context`.
///
/// A fresh signing key is derived on every call; nothing is cached.
///
/// # Errors
/// Returns a [`SigningError`] if any HMAC step fails.
pub fn sign(
    credentials: &Credentials,
    context: &SigningContext,
    request: &SignableRequest<'_>,
) -> Result<Signature, SigningError> {
    let canonical_request = request.canonical_request();
    debug!(canonical_request, "Built canonical request");

    let canonical_hash = hash_payload(canonical_request.as_bytes());
    let string_to_sign = build_string_to_sign(
        context.timestamp(),
        &context.credential_scope(),
        &canonical_hash,
    );
    debug!(string_to_sign, "Built string to sign");

    let signing_key = derive_signing_key(
        credentials.secret_key(),
        context.datestamp(),
        context.region(),
        context.service(),
    )?;
    let signature = compute_signature(&signing_key, &string_to_sign)?;

    Ok(Signature {
        signature,
        signed_headers: build_signed_headers_string(request.headers),
        credential_scope: format!(
            "{}/{}/{}/{SCOPE_TERMINATOR}",
            context.datestamp(),
            context.region(),
            context.service()
        ),
    })
}

/// Compute the SHA-256 hash of `payload` as lowercase hex.
///
/// # Examples
///
/// ```
/// use beacon_auth::hash_payload;
///
/// assert_eq!(
///     hash_payload(b""),
///     "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
/// );
/// ```
#[must_use]
pub fn hash_payload(payload: &[u8]) -> String {
    hex::encode(Sha256::digest(payload))
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> Result<Vec<u8>, SigningError> {
    let mut mac = HmacSha256::new_from_slice(key).map_err(|_| SigningError::InvalidKey)?;
    mac.update(data);
    Ok(mac.finalize().into_bytes().to_vec())
}
