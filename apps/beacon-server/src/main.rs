//! Beacon Server - analytics tracking beacon.
//!
//! Every `GET` is answered with a small stylesheet. On the way, the request
//! metadata (account id, peer address, headers) is captured, optionally
//! enriched with the owning network from the RIPE database, and published to
//! an Amazon Kinesis stream through a SigV4-signed `PutRecord` call.
//!
//! # Usage
//!
//! ```text
//! KINESIS_STREAM=beacon-events ACCESS_KEY=... SECRET_KEY=... beacon-server
//! ```
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `BEACON_LISTEN` | `0.0.0.0:8080` | Bind address |
//! | `LOG_LEVEL` | `info` | Log level filter; invalid values fall back to `info` |
//! | `RUST_LOG` | *(unset)* | Fine-grained tracing filter (overrides `LOG_LEVEL`) |
//! | `KINESIS_REGION` / `AWS_REGION` | `us-east-1` | Region of the stream |
//! | `KINESIS_STREAM` | *(unset)* | Stream name; publishing is disabled without it |
//! | `ACCESS_KEY` / `AWS_ACCESS_KEY_ID` | *(unset)* | Access key id |
//! | `SECRET_KEY` / `AWS_SECRET_ACCESS_KEY` | *(unset)* | Secret access key |
//! | `KINESIS_ENDPOINT_URL` | *(regional endpoint)* | Endpoint override |
//! | `KINESIS_TIMEOUT_MS` | `5000` | `PutRecord` timeout |
//! | `KINESIS_LEGACY_SCOPE_REGION` | *(unset)* | Pin the signing scope and host to a region |
//! | `BEACON_STYLESHEET` | *(embedded)* | Stylesheet file served to clients |
//! | `BEACON_ACCOUNT_PARAM` | `charset` | Query parameter carrying the account id |
//! | `ENRICHMENT_ENABLED` | `true` | Look up the owning network of each peer |
//! | `RIPE_ENDPOINT_URL` | `https://rest.db.ripe.net` | RIPE database REST base URL |
//! | `RIPE_TIMEOUT_MS` | `3000` | Enrichment lookup timeout |

mod handler;
mod record;
mod service;
mod sink;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use beacon_core::BeaconConfig;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as HttpConnBuilder;
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::handler::{BeaconHandler, HEALTH_PATH};
use crate::service::BeaconService;
use crate::state::BeaconState;

/// Server version reported at startup.
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Filter used when `LOG_LEVEL` is unset or invalid.
const DEFAULT_LOG_LEVEL: &str = "info";

/// Initialize the tracing subscriber.
///
/// Uses `RUST_LOG` if set, otherwise falls back to `LOG_LEVEL`. An invalid
/// `LOG_LEVEL` is reported once tracing is up and replaced by `info`.
fn init_tracing(log_level: &str) {
    let (filter, rejected) = if std::env::var("RUST_LOG").is_ok() {
        (EnvFilter::from_default_env(), None)
    } else {
        match EnvFilter::try_new(log_level) {
            Ok(filter) => (filter, None),
            Err(e) => (EnvFilter::new(DEFAULT_LOG_LEVEL), Some(e)),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    if let Some(e) = rejected {
        warn!(
            log_level,
            fallback = DEFAULT_LOG_LEVEL,
            error = %e,
            "invalid log level filter"
        );
    }
}

/// Read the log level from the environment.
fn log_level() -> String {
    std::env::var("LOG_LEVEL").unwrap_or_else(|_| DEFAULT_LOG_LEVEL.to_string())
}

/// Run the accept loop, serving connections until a shutdown signal is received.
async fn serve(listener: TcpListener, handler: Arc<BeaconHandler>) -> Result<()> {
    let graceful = hyper_util::server::graceful::GracefulShutdown::new();
    let http = HttpConnBuilder::new(TokioExecutor::new());

    let shutdown = async {
        tokio::signal::ctrl_c().await.ok();
        info!("received shutdown signal, draining connections");
    };

    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            result = listener.accept() => {
                let (stream, peer_addr) = match result {
                    Ok(conn) => conn,
                    Err(e) => {
                        warn!(error = %e, "failed to accept connection");
                        continue;
                    }
                };

                let svc = BeaconService::new(Arc::clone(&handler), peer_addr);
                let conn = http.serve_connection(TokioIo::new(stream), svc);
                let conn = graceful.watch(conn.into_owned());

                tokio::spawn(async move {
                    if let Err(e) = conn.await {
                        error!(peer_addr = %peer_addr, error = %e, "connection error");
                    }
                });
            }

            () = &mut shutdown => {
                info!("shutting down gracefully");
                break;
            }
        }
    }

    // Wait for in-flight requests to complete.
    graceful.shutdown().await;
    info!("all connections drained, exiting");

    Ok(())
}

/// Perform a health check by connecting to the server and requesting the health endpoint.
async fn run_health_check(addr: &str) -> Result<()> {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;

    let stream = TcpStream::connect(addr)
        .await
        .with_context(|| format!("cannot connect to {addr}"))?;

    let (mut reader, mut writer) = stream.into_split();

    let request =
        format!("GET {HEALTH_PATH} HTTP/1.1\r\nHost: {addr}\r\nConnection: close\r\n\r\n");
    writer.write_all(request.as_bytes()).await?;
    writer.shutdown().await?;

    let mut response = String::new();
    reader.read_to_string(&mut response).await?;

    if response.contains("200 OK") && response.contains("\"running\"") {
        Ok(())
    } else {
        anyhow::bail!("unhealthy response from {addr}")
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Handle --health-check flag for Docker HEALTHCHECK.
    if std::env::args().any(|a| a == "--health-check") {
        let addr = BeaconConfig::from_env()
            .listen
            .replace("0.0.0.0", "127.0.0.1");
        let healthy = run_health_check(&addr).await.is_ok();
        std::process::exit(i32::from(!healthy));
    }

    init_tracing(&log_level());

    let config = BeaconConfig::from_env();
    let state = BeaconState::from_config(&config);
    info!(
        publishing = state.target.is_some(),
        enrichment = state.registry.is_some(),
        stylesheet_bytes = state.stylesheet.len(),
        account_param = %state.account_param,
        "initialized beacon state",
    );
    let handler = Arc::new(BeaconHandler::new(Arc::new(state)));

    let addr: SocketAddr = config
        .listen
        .parse()
        .with_context(|| format!("invalid bind address: {}", config.listen))?;

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind to {addr}"))?;

    info!(%addr, version = VERSION, "starting Beacon Server");

    serve(listener, handler).await
}
