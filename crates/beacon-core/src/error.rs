//! Error types for the beacon core.

use std::path::PathBuf;

/// Configuration and startup error.
#[derive(Debug, thiserror::Error)]
pub enum BeaconError {
    /// A required configuration variable is not set.
    #[error("missing required configuration: {0}")]
    MissingConfig(&'static str),

    /// A configuration variable is set but cannot be parsed.
    #[error("invalid value for {key}: {value:?}")]
    InvalidConfig {
        /// Name of the offending variable.
        key: &'static str,
        /// The raw value that was rejected.
        value: String,
    },

    /// Invalid AWS region identifier.
    #[error("invalid AWS region: {0:?}")]
    InvalidRegion(String),

    /// A resource named by the configuration could not be read.
    #[error("failed to read {}: {source}", path.display())]
    Resource {
        /// Path of the resource.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

/// Convenience result type for beacon startup operations.
pub type BeaconResult<T> = Result<T, BeaconError>;
