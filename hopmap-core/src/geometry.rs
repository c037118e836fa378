use crate::constants::{EARTH_RADIUS_M, METERS_PER_KM, MS_PER_SEC, SPEED_OF_LIGHT_M_PER_S};

/// Great-circle distance in meters on a spherical Earth.
pub fn haversine_m(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let dlat = (lat2 - lat1).to_radians();
    let dlon = (lon2 - lon1).to_radians();
    let lat1 = lat1.to_radians();
    let lat2 = lat2.to_radians();
    let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().min(1.0).asin();
    EARTH_RADIUS_M * c
}

pub fn haversine_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    haversine_m(lat1, lon1, lat2, lon2) / METERS_PER_KM
}

/// Lower bound on latency over `distance_m`, with `multiplier` covering
/// indirect routing and protocol overhead.
pub fn min_latency_ms(distance_m: f64, multiplier: f64) -> f64 {
    distance_m * multiplier / SPEED_OF_LIGHT_M_PER_S * MS_PER_SEC
}
