use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::constants::*;
use crate::error::ConfigError;

/// Which fields make two stored edges the same topology link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MergeKey {
    /// `(origin, destination)`: the first stored latency for a link wins forever.
    #[default]
    Pair,
    /// `(runId, origin, destination)`: every run keeps its own observation.
    RunPair,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    pub targets_path: PathBuf,
    pub results_path: PathBuf,
    pub geozones_path: PathBuf,
    pub probe_timeout_secs: u64,
    pub hop_floor: u32,
    pub merge_key: MergeKey,
    pub geo_endpoint: String,
    pub geo_timeout_secs: u64,
    pub retry_failed_lookups: bool,
    pub speed_multiplier: f64,
    pub max_hop_distance_km: f64,
    pub print_limit: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            targets_path: PathBuf::from(DEFAULT_TARGETS_PATH),
            results_path: PathBuf::from(DEFAULT_RESULTS_PATH),
            geozones_path: PathBuf::from(DEFAULT_GEOZONES_PATH),
            probe_timeout_secs: DEFAULT_PROBE_TIMEOUT_SECS,
            hop_floor: DEFAULT_HOP_FLOOR,
            merge_key: MergeKey::default(),
            geo_endpoint: DEFAULT_GEO_ENDPOINT.to_string(),
            geo_timeout_secs: DEFAULT_GEO_TIMEOUT_SECS,
            retry_failed_lookups: false,
            speed_multiplier: DEFAULT_SPEED_MULTIPLIER,
            max_hop_distance_km: DEFAULT_MAX_HOP_DISTANCE_KM,
            print_limit: DEFAULT_PRINT_LIMIT,
        }
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let data = fs::read(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let cfg: Config = serde_json::from_slice(&data).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Loads `path` if given; a config file that does not exist means defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            None => Ok(Self::default()),
            Some(path) => match Self::load(path) {
                Err(ConfigError::Read { source, .. }) if source.kind() == io::ErrorKind::NotFound => {
                    log::info!("config {} not found, using defaults", path.display());
                    Ok(Self::default())
                }
                other => other,
            },
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.probe_timeout_secs == 0 || self.geo_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "probeTimeoutSecs and geoTimeoutSecs must be > 0".into(),
            ));
        }
        if !(self.speed_multiplier.is_finite() && self.speed_multiplier > 0.0) {
            return Err(ConfigError::Invalid("speedMultiplier must be > 0".into()));
        }
        if !(self.max_hop_distance_km.is_finite() && self.max_hop_distance_km > 0.0) {
            return Err(ConfigError::Invalid("maxHopDistanceKm must be > 0".into()));
        }
        if self.geo_endpoint.trim().is_empty() {
            return Err(ConfigError::Invalid("geoEndpoint must not be empty".into()));
        }
        Ok(())
    }

    /// The hop floor actually applied: hop 1 is always excluded.
    pub fn effective_hop_floor(&self) -> u32 {
        self.hop_floor.max(DEFAULT_HOP_FLOOR)
    }
}
