//! Immutable state built once at startup and shared by every request.

use std::sync::Arc;

use beacon_auth::Credentials;
use beacon_core::{BeaconConfig, BeaconError};
use beacon_enrichment::{NetworkRegistry, RipeClient};
use beacon_kinesis::{KinesisPublisher, PublisherConfig};
use bytes::Bytes;
use tracing::{error, info, warn};

/// Stylesheet served when `BEACON_STYLESHEET` is unset.
const DEFAULT_STYLESHEET: &[u8] = include_bytes!("../assets/beacon.css");

/// Where beacon records go.
#[derive(Clone)]
pub struct StreamTarget {
    /// Publisher used for every record.
    pub sink: Arc<dyn crate::sink::RecordSink>,
    /// Region of the stream.
    pub region: String,
    /// Stream name.
    pub stream_name: String,
}

impl std::fmt::Debug for StreamTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamTarget")
            .field("region", &self.region)
            .field("stream_name", &self.stream_name)
            .finish_non_exhaustive()
    }
}

/// Read-only state of the beacon server.
///
/// Startup problems never abort the process: a missing stream or credential
/// or a malformed region disables publishing, an unreadable stylesheet is replaced by an empty one,
/// and a broken registry client disables enrichment. Each case is logged.
#[derive(Clone)]
pub struct BeaconState {
    /// Response body of every beacon hit.
    pub stylesheet: Bytes,
    /// Query parameter carrying the account id.
    pub account_param: String,
    /// Publishing target, `None` when publishing is disabled.
    pub target: Option<StreamTarget>,
    /// Enrichment registry, `None` when enrichment is disabled.
    pub registry: Option<Arc<dyn NetworkRegistry>>,
}

impl std::fmt::Debug for BeaconState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BeaconState")
            .field("stylesheet_len", &self.stylesheet.len())
            .field("account_param", &self.account_param)
            .field("target", &self.target)
            .field("registry", &self.registry.as_ref().map(|_| "..."))
            .finish()
    }
}

impl BeaconState {
    /// Build the state from configuration, logging every component that
    /// fails to initialise.
    #[must_use]
    pub fn from_config(config: &BeaconConfig) -> Self {
        let stylesheet = load_stylesheet(config).unwrap_or_else(|e| {
            error!(error = %e, "unable to load stylesheet, serving an empty one");
            Bytes::new()
        });

        let target = match build_target(config) {
            Ok(target) => {
                info!(
                    region = %target.region,
                    stream = %target.stream_name,
                    "publishing beacon records to Kinesis"
                );
                Some(target)
            }
            Err(e) => {
                error!(error = %e, "unable to initialise Kinesis publisher, publishing disabled");
                None
            }
        };

        let registry = if config.enrichment_enabled {
            match RipeClient::new(&config.ripe_endpoint_url, config.ripe_timeout) {
                Ok(client) => Some(Arc::new(client) as Arc<dyn NetworkRegistry>),
                Err(e) => {
                    warn!(error = %e, "unable to initialise RIPE client, enrichment disabled");
                    None
                }
            }
        } else {
            None
        };

        Self {
            stylesheet,
            account_param: config.account_param.clone(),
            target,
            registry,
        }
    }
}

fn load_stylesheet(config: &BeaconConfig) -> Result<Bytes, BeaconError> {
    match &config.stylesheet_path {
        Some(path) => std::fs::read(path)
            .map(Bytes::from)
            .map_err(|source| BeaconError::Resource {
                path: path.clone(),
                source,
            }),
        None => Ok(Bytes::from_static(DEFAULT_STYLESHEET)),
    }
}

fn build_target(config: &BeaconConfig) -> anyhow::Result<StreamTarget> {
    let settings = config.stream_settings()?;
    let publisher = KinesisPublisher::new(
        Credentials::new(settings.access_key, settings.secret_key),
        PublisherConfig {
            endpoint_url: config.kinesis_endpoint_url.clone(),
            timeout: config.kinesis_timeout,
            legacy_scope_region: settings
                .legacy_scope_region
                .as_ref()
                .map(|region| region.as_str().to_owned()),
        },
    )?;
    Ok(StreamTarget {
        sink: Arc::new(publisher),
        region: settings.region.as_str().to_owned(),
        stream_name: settings.stream_name.to_owned(),
    })
}
