//! Process configuration for the beacon.
//!
//! All configuration is driven by environment variables and read once at
//! startup. The resulting [`BeaconConfig`] is immutable and shared by
//! reference with the request-handling path.
//!
//! Loading never fails. A malformed timeout or flag is logged and replaced by
//! its default; a malformed region is kept verbatim and rejected by
//! [`BeaconConfig::stream_settings`], which disables publishing only.

use std::env;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use tracing::{debug, warn};

use crate::error::{BeaconError, BeaconResult};
use crate::types::AwsRegion;

/// Global configuration for the beacon server.
#[derive(Clone)]
pub struct BeaconConfig {
    /// Bind address for the HTTP listener.
    pub listen: String,
    /// Region hosting the Kinesis stream, as configured.
    pub region: String,
    /// Name of the Kinesis stream records are published to.
    pub stream_name: Option<String>,
    /// AWS access key id.
    pub access_key: Option<String>,
    /// AWS secret access key.
    pub secret_key: Option<String>,
    /// Override for the Kinesis endpoint (e.g. a local emulator).
    pub kinesis_endpoint_url: Option<String>,
    /// Timeout applied to each `PutRecord` call.
    pub kinesis_timeout: Duration,
    /// Pin the credential scope and signed host to this region instead of
    /// the target region.
    pub legacy_scope_region: Option<String>,
    /// Path of the stylesheet served as the beacon response.
    pub stylesheet_path: Option<PathBuf>,
    /// Query parameter carrying the account identifier.
    pub account_param: String,
    /// Whether network-registry enrichment is enabled.
    pub enrichment_enabled: bool,
    /// Base URL of the RIPE database REST API.
    pub ripe_endpoint_url: String,
    /// Timeout applied to each enrichment lookup.
    pub ripe_timeout: Duration,
}

impl Default for BeaconConfig {
    fn default() -> Self {
        Self {
            listen: "0.0.0.0:8080".to_owned(),
            region: AwsRegion::DEFAULT.to_owned(),
            stream_name: None,
            access_key: None,
            secret_key: None,
            kinesis_endpoint_url: None,
            kinesis_timeout: Duration::from_millis(5_000),
            legacy_scope_region: None,
            stylesheet_path: None,
            account_param: "charset".to_owned(),
            enrichment_enabled: true,
            ripe_endpoint_url: "https://rest.db.ripe.net".to_owned(),
            ripe_timeout: Duration::from_millis(3_000),
        }
    }
}

impl fmt::Debug for BeaconConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BeaconConfig")
            .field("listen", &self.listen)
            .field("region", &self.region)
            .field("stream_name", &self.stream_name)
            .field("access_key", &self.access_key.as_ref().map(|_| "..."))
            .field("secret_key", &self.secret_key.as_ref().map(|_| "..."))
            .field("kinesis_endpoint_url", &self.kinesis_endpoint_url)
            .field("kinesis_timeout", &self.kinesis_timeout)
            .field("legacy_scope_region", &self.legacy_scope_region)
            .field("stylesheet_path", &self.stylesheet_path)
            .field("account_param", &self.account_param)
            .field("enrichment_enabled", &self.enrichment_enabled)
            .field("ripe_endpoint_url", &self.ripe_endpoint_url)
            .field("ripe_timeout", &self.ripe_timeout)
            .finish()
    }
}

/// Validated settings required to publish records.
#[derive(Clone, PartialEq, Eq)]
pub struct StreamSettings<'a> {
    /// Region hosting the stream.
    pub region: AwsRegion,
    /// Stream name.
    pub stream_name: &'a str,
    /// AWS access key id.
    pub access_key: &'a str,
    /// AWS secret access key.
    pub secret_key: &'a str,
    /// Region pinned into the credential scope, if any.
    pub legacy_scope_region: Option<AwsRegion>,
}

impl fmt::Debug for StreamSettings<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamSettings")
            .field("region", &self.region)
            .field("stream_name", &self.stream_name)
            .field("legacy_scope_region", &self.legacy_scope_region)
            .finish_non_exhaustive()
    }
}

impl BeaconConfig {
    /// Load configuration from environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// Unparsable timeouts and flags are logged and left at their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        let first = |keys: &[&str]| {
            keys.iter()
                .find_map(|key| lookup(key).filter(|v| !v.trim().is_empty()))
        };

        if let Some(v) = first(&["BEACON_LISTEN"]) {
            config.listen = v;
        }
        if let Some(v) = first(&["KINESIS_REGION", "AWS_REGION"]) {
            config.region = v.trim().to_owned();
        }
        config.stream_name = first(&["KINESIS_STREAM"]);
        config.access_key = first(&["ACCESS_KEY", "AWS_ACCESS_KEY_ID"]);
        config.secret_key = first(&["SECRET_KEY", "AWS_SECRET_ACCESS_KEY"]);
        config.kinesis_endpoint_url = first(&["KINESIS_ENDPOINT_URL"]);
        if let Some(v) = first(&["KINESIS_TIMEOUT_MS"]) {
            config.kinesis_timeout = or_default(
                parse_millis("KINESIS_TIMEOUT_MS", &v),
                config.kinesis_timeout,
            );
        }
        config.legacy_scope_region =
            first(&["KINESIS_LEGACY_SCOPE_REGION"]).map(|v| v.trim().to_owned());
        config.stylesheet_path = first(&["BEACON_STYLESHEET"]).map(PathBuf::from);
        if let Some(v) = first(&["BEACON_ACCOUNT_PARAM"]) {
            config.account_param = v;
        }
        if let Some(v) = first(&["ENRICHMENT_ENABLED"]) {
            config.enrichment_enabled = or_default(
                parse_bool("ENRICHMENT_ENABLED", &v),
                config.enrichment_enabled,
            );
        }
        if let Some(v) = first(&["RIPE_ENDPOINT_URL"]) {
            config.ripe_endpoint_url = v;
        }
        if let Some(v) = first(&["RIPE_TIMEOUT_MS"]) {
            config.ripe_timeout =
                or_default(parse_millis("RIPE_TIMEOUT_MS", &v), config.ripe_timeout);
        }

        debug!(?config, "loaded beacon configuration");
        config
    }

    /// Validate and return the settings required for publishing.
    ///
    /// # Errors
    /// Returns [`BeaconError::MissingConfig`] naming the first absent setting,
    /// or [`BeaconError::InvalidRegion`] for a malformed target or scope region.
    pub fn stream_settings(&self) -> BeaconResult<StreamSettings<'_>> {
        let region = AwsRegion::new(self.region.as_str())?;
        let legacy_scope_region = self
            .legacy_scope_region
            .as_deref()
            .map(AwsRegion::new)
            .transpose()?;
        let stream_name = self
            .stream_name
            .as_deref()
            .ok_or(BeaconError::MissingConfig("KINESIS_STREAM"))?;
        let access_key = self
            .access_key
            .as_deref()
            .ok_or(BeaconError::MissingConfig("ACCESS_KEY"))?;
        let secret_key = self
            .secret_key
            .as_deref()
            .ok_or(BeaconError::MissingConfig("SECRET_KEY"))?;
        Ok(StreamSettings {
            region,
            stream_name,
            access_key,
            secret_key,
            legacy_scope_region,
        })
    }
}

fn or_default<T: fmt::Debug>(parsed: BeaconResult<T>, default: T) -> T {
    parsed.unwrap_or_else(|e| {
        warn!(error = %e, ?default, "ignoring invalid setting");
        default
    })
}

fn parse_millis(key: &'static str, value: &str) -> BeaconResult<Duration> {
    value
        .trim()
        .parse::<u64>()
        .ok()
        .filter(|ms| *ms > 0)
        .map(Duration::from_millis)
        .ok_or_else(|| BeaconError::InvalidConfig {
            key,
            value: value.to_owned(),
        })
}

fn parse_bool(key: &'static str, value: &str) -> BeaconResult<bool> {
    match value.trim() {
        "1" | "true" | "yes" | "TRUE" | "YES" => Ok(true),
        "0" | "false" | "no" | "FALSE" | "NO" => Ok(false),
        _ => Err(BeaconError::InvalidConfig {
            key,
            value: value.to_owned(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        move |key| map.get(key).cloned()
    }

    fn complete(extra: &[(&'static str, &'static str)]) -> BeaconConfig {
        let mut pairs = vec![
            ("KINESIS_STREAM", "beacon-events"),
            ("ACCESS_KEY", "AKID"),
            ("SECRET_KEY", "secret"),
        ];
        pairs.extend_from_slice(extra);
        BeaconConfig::from_lookup(lookup_from(&pairs))
    }

    #[test]
    fn test_should_create_default_config() {
        let config = BeaconConfig::default();
        assert_eq!(config.listen, "0.0.0.0:8080");
        assert_eq!(config.region, "us-east-1");
        assert_eq!(config.account_param, "charset");
        assert!(config.enrichment_enabled);
        assert!(config.legacy_scope_region.is_none());
    }

    #[test]
    fn test_should_load_stream_settings_from_lookup() {
        let config = complete(&[
            ("KINESIS_REGION", "eu-west-1"),
            ("KINESIS_TIMEOUT_MS", "1500"),
        ]);

        assert_eq!(config.kinesis_timeout, Duration::from_millis(1500));
        let settings = config.stream_settings().unwrap();
        assert_eq!(settings.region.as_str(), "eu-west-1");
        assert_eq!(settings.stream_name, "beacon-events");
        assert_eq!(settings.access_key, "AKID");
        assert_eq!(settings.secret_key, "secret");
        assert!(settings.legacy_scope_region.is_none());
    }

    #[test]
    fn test_should_fall_back_to_aws_variable_names() {
        let config = BeaconConfig::from_lookup(lookup_from(&[
            ("AWS_REGION", "us-west-2"),
            ("KINESIS_STREAM", "s"),
            ("AWS_ACCESS_KEY_ID", "AKID"),
            ("AWS_SECRET_ACCESS_KEY", "secret"),
        ]));

        assert_eq!(config.region, "us-west-2");
        assert_eq!(config.access_key.as_deref(), Some("AKID"));
        assert_eq!(config.secret_key.as_deref(), Some("secret"));
    }

    #[test]
    fn test_should_report_missing_stream_settings() {
        let config = BeaconConfig::from_lookup(lookup_from(&[("KINESIS_STREAM", "s")]));
        assert!(matches!(
            config.stream_settings(),
            Err(BeaconError::MissingConfig("ACCESS_KEY"))
        ));
    }

    #[test]
    fn test_should_keep_loading_with_malformed_region() {
        let config = complete(&[("KINESIS_REGION", "EU-WEST-1")]);
        assert_eq!(config.region, "EU-WEST-1");
        assert!(matches!(
            config.stream_settings(),
            Err(BeaconError::InvalidRegion(region)) if region == "EU-WEST-1"
        ));
    }

    #[test]
    fn test_should_reject_malformed_legacy_scope_region_in_stream_settings() {
        let config = complete(&[("KINESIS_LEGACY_SCOPE_REGION", "us_east_1")]);
        assert!(matches!(
            config.stream_settings(),
            Err(BeaconError::InvalidRegion(_))
        ));
    }

    #[test]
    fn test_should_fall_back_to_defaults_for_invalid_timeouts_and_flags() {
        let config = BeaconConfig::from_lookup(lookup_from(&[
            ("KINESIS_TIMEOUT_MS", "5s"),
            ("RIPE_TIMEOUT_MS", "0"),
            ("ENRICHMENT_ENABLED", "maybe"),
        ]));
        let defaults = BeaconConfig::default();
        assert_eq!(config.kinesis_timeout, defaults.kinesis_timeout);
        assert_eq!(config.ripe_timeout, defaults.ripe_timeout);
        assert!(config.enrichment_enabled);
    }

    #[test]
    fn test_should_reject_invalid_millis_and_bool_values() {
        assert!(matches!(
            parse_millis("KINESIS_TIMEOUT_MS", "soon"),
            Err(BeaconError::InvalidConfig {
                key: "KINESIS_TIMEOUT_MS",
                ..
            })
        ));
        assert!(parse_bool("ENRICHMENT_ENABLED", "maybe").is_err());
        assert!(!parse_bool("ENRICHMENT_ENABLED", "no").unwrap());
    }

    #[test]
    fn test_should_parse_legacy_scope_region_and_enrichment_flag() {
        let config = complete(&[
            ("KINESIS_LEGACY_SCOPE_REGION", "us-east-1"),
            ("ENRICHMENT_ENABLED", "false"),
        ]);
        assert!(!config.enrichment_enabled);
        let settings = config.stream_settings().unwrap();
        assert_eq!(
            settings.legacy_scope_region.as_ref().map(AwsRegion::as_str),
            Some("us-east-1")
        );
    }

    #[test]
    fn test_should_redact_keys_in_debug_output() {
        let config = BeaconConfig {
            access_key: Some("AKIDEXAMPLE".to_owned()),
            secret_key: Some("super-secret".to_owned()),
            ..BeaconConfig::default()
        };
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("AKIDEXAMPLE"));
        assert!(!rendered.contains("super-secret"));

        let config = complete(&[]);
        let rendered = format!("{:?}", config.stream_settings().unwrap());
        assert!(!rendered.contains("AKID"));
        assert!(!rendered.contains("secret\""));
    }
}
