pub const UNKNOWN_ORIGIN: &str = "unknown";

pub const SPEED_OF_LIGHT_M_PER_S: f64 = 299_792_458.0;
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;
pub const METERS_PER_KM: f64 = 1000.0;
pub const MS_PER_SEC: f64 = 1000.0;

pub const DEFAULT_SPEED_MULTIPLIER: f64 = 3.0;
pub const DEFAULT_MAX_HOP_DISTANCE_KM: f64 = 3000.0;
pub const DEFAULT_PRINT_LIMIT: usize = 10;

pub const DEFAULT_HOP_FLOOR: u32 = 1;
#[cfg(windows)]
pub const DEFAULT_PROBE_TIMEOUT_SECS: u64 = 30;
#[cfg(not(windows))]
pub const DEFAULT_PROBE_TIMEOUT_SECS: u64 = 120;

pub const DEFAULT_TARGETS_PATH: &str = "targets.json";
pub const DEFAULT_RESULTS_PATH: &str = "results.json";
pub const DEFAULT_GEOZONES_PATH: &str = "geozones.json";

pub const DEFAULT_GEO_ENDPOINT: &str = "https://ipwhois.app/json/";
pub const DEFAULT_GEO_TIMEOUT_SECS: u64 = 10;

pub const RUN_ID_HEX_DIGITS: usize = 16;
pub const SUDO_PASSWORD_ENV: &str = "HOPMAP_SUDO_PASSWORD";
