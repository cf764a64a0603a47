//! Core types and configuration for the analytics beacon.
//!
//! This crate holds the pieces shared by the signer, the stream publisher and
//! the HTTP front end: the AWS region type, the process configuration loaded
//! once at startup, and the configuration error type.

mod config;
mod error;
mod types;

pub use config::{BeaconConfig, StreamSettings};
pub use error::{BeaconError, BeaconResult};
pub use types::AwsRegion;
