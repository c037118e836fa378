use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read { path: PathBuf, source: io::Error },

    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("invalid config value: {0}")]
    Invalid(String),
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("result store {path} not found")]
    Missing { path: PathBuf },

    #[error("result store I/O error on {path}: {source}")]
    Io { path: PathBuf, source: io::Error },

    #[error("result store {path} is not a valid edge array: {source}")]
    Format {
        path: PathBuf,
        source: serde_json::Error,
    },
}

#[derive(Error, Debug)]
pub enum GeozoneError {
    #[error("geozone file {path} not found")]
    Missing { path: PathBuf },

    #[error("failed to read geozone file {path}: {source}")]
    Io { path: PathBuf, source: io::Error },

    #[error("geozone file {path} is not a feature collection: {source}")]
    Format {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Failure of a single geolocation lookup. Never aborts an enrichment run.
#[derive(Error, Debug)]
pub enum LookupError {
    #[error("geolocation request failed: {0}")]
    Transport(String),

    #[error("geolocation service returned status {0}")]
    Status(u16),

    #[error("geolocation service rejected the address: {0}")]
    Rejected(String),

    #[error("malformed geolocation response: {0}")]
    Malformed(String),
}
