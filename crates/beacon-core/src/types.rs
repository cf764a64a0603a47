//! Common AWS type definitions.

use std::fmt;
use std::str::FromStr;

use crate::BeaconError;

/// AWS Region identifier, e.g. `eu-west-1`.
///
/// The region ends up inside a hostname and a credential scope, so it is
/// restricted to lowercase ASCII letters, digits and dashes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct AwsRegion(String);

impl AwsRegion {
    /// Default region.
    pub const DEFAULT: &str = "us-east-1";

    /// Parse and validate a region identifier.
    ///
    /// # Errors
    /// Returns [`BeaconError::InvalidRegion`] if the value is empty or contains
    /// characters other than `[a-z0-9-]`.
    pub fn new(region: impl Into<String>) -> Result<Self, BeaconError> {
        let region = region.into();
        let valid = !region.is_empty()
            && !region.starts_with('-')
            && !region.ends_with('-')
            && region
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');
        if !valid {
            return Err(BeaconError::InvalidRegion(region));
        }
        Ok(Self(region))
    }

    /// Get the region as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for AwsRegion {
    fn default() -> Self {
        Self(Self::DEFAULT.to_owned())
    }
}

impl FromStr for AwsRegion {
    type Err = BeaconError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl AsRef<str> for AwsRegion {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AwsRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
