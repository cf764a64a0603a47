//! Error types for SigV4 signing.

/// Errors that abort the computation of a request signature.
///
/// None of these are recoverable for the request being signed; the caller
/// abandons the attempt.
#[derive(Debug, thiserror::Error)]
pub enum SigningError {
    /// The HMAC implementation rejected a key.
    #[error("HMAC-SHA256 rejected the signing key")]
    InvalidKey,

    /// A timestamp was not in `YYYYMMDD'T'HHMMSS'Z'` form.
    #[error("invalid signing timestamp: {0:?}")]
    InvalidTimestamp(String),
}
