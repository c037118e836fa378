pub mod config;
pub mod constants;
pub mod enrich;
pub mod error;
pub mod geometry;
pub mod geozone;
pub mod hops;
pub mod logging;
pub mod parse;
pub mod plausibility;
pub mod store;
pub mod targets;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

pub use config::{Config, MergeKey};
pub use constants::UNKNOWN_ORIGIN;
pub use error::{ConfigError, GeozoneError, LookupError, StoreError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hop {
    pub hop_number: u32,
    pub address: String,
    pub latency_ms: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeoInfo {
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub region: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
}

impl GeoInfo {
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lon)) if lat.is_finite() && lon.is_finite() => Some((lat, lon)),
            _ => None,
        }
    }
}

/// A directed hop-to-hop link as persisted in the result store.
///
/// The geo slots are tri-state: `None` means no lookup has been attempted,
/// `Some(None)` means the lookup failed (serialized as `null`) and
/// `Some(Some(_))` carries the resolved location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Edge {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_id: Option<String>,
    pub origin: String,
    pub destination: String,
    #[serde(rename = "pingTime", default, deserialize_with = "whole_ms")]
    pub latency_ms: Option<u32>,
    #[serde(
        default,
        alias = "origin_geo",
        skip_serializing_if = "Option::is_none",
        deserialize_with = "present"
    )]
    pub origin_geo: Option<Option<GeoInfo>>,
    #[serde(
        default,
        alias = "destination_geo",
        skip_serializing_if = "Option::is_none",
        deserialize_with = "present"
    )]
    pub destination_geo: Option<Option<GeoInfo>>,
    /// Keys written by other tools are carried through untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Edge {
    pub fn new(origin: impl Into<String>, destination: impl Into<String>, latency_ms: Option<u32>) -> Self {
        Self {
            run_id: None,
            origin: origin.into(),
            destination: destination.into(),
            latency_ms,
            origin_geo: None,
            destination_geo: None,
            extra: Map::new(),
        }
    }

    pub fn with_run_id(mut self, run_id: Option<&str>) -> Self {
        self.run_id = run_id.map(str::to_string);
        self
    }

    /// Coordinates of both endpoints, when both lookups succeeded with a position.
    pub fn endpoint_coordinates(&self) -> Option<((f64, f64), (f64, f64))> {
        let origin = self.origin_geo.as_ref()?.as_ref()?.coordinates()?;
        let destination = self.destination_geo.as_ref()?.as_ref()?.coordinates()?;
        Some((origin, destination))
    }
}

// A key that is present always lands in `Some`, so an explicit `null` stays
// distinguishable from a missing key.
fn present<'de, D>(deserializer: D) -> Result<Option<Option<GeoInfo>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<GeoInfo>::deserialize(deserializer).map(Some)
}

// Other writers may store fractional milliseconds; they are rounded the way
// the parser rounds replies.
fn whole_ms<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<f64>::deserialize(deserializer)? {
        None => Ok(None),
        Some(ms) if ms.is_finite() && ms >= 0.0 => Ok(Some(ms.round_ties_even().min(u32::MAX as f64) as u32)),
        Some(ms) => Err(D::Error::custom(format!("invalid pingTime {ms}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn geo_slot_distinguishes_null_from_absent() {
        let text = r#"[
            {"origin":"unknown","destination":"10.0.0.2","pingTime":4},
            {"origin":"10.0.0.2","destination":"10.0.0.3","pingTime":null,"originGeo":null,
             "destinationGeo":{"country":"NL","region":"NH","city":"Amsterdam","latitude":52.37,"longitude":4.9}}
        ]"#;
        let edges: Vec<Edge> = serde_json::from_str(text).unwrap();
        assert_eq!(edges[0].origin_geo, None);
        assert_eq!(edges[0].destination_geo, None);
        assert_eq!(edges[1].origin_geo, Some(None));
        let geo = edges[1].destination_geo.clone().unwrap().unwrap();
        assert_eq!(geo.city, "Amsterdam");
        assert_eq!(edges[1].latency_ms, None);

        let out = serde_json::to_value(&edges).unwrap();
        assert!(out[0].get("originGeo").is_none());
        assert!(out[1]["originGeo"].is_null());
        assert_eq!(out[0]["pingTime"], 4);
    }

    #[test]
    fn legacy_snake_case_geo_keys_are_read() {
        let text = r#"{"origin":"a","destination":"b","pingTime":3,"origin_geo":null,"destination_geo":null}"#;
        let edge: Edge = serde_json::from_str(text).unwrap();
        assert_eq!(edge.origin_geo, Some(None));
        assert_eq!(edge.destination_geo, Some(None));
        assert!(edge.extra.is_empty());
    }

    #[test]
    fn unknown_keys_survive_round_trip() {
        let text = r#"{"origin":"a","destination":"b","pingTime":3,"note":"manual"}"#;
        let edge: Edge = serde_json::from_str(text).unwrap();
        let back = serde_json::to_value(&edge).unwrap();
        assert_eq!(back["note"], "manual");
    }

    #[test]
    fn fractional_ping_times_are_rounded_half_to_even() {
        let text = r#"[
            {"origin":"unknown","destination":"10.0.0.2","pingTime":4},
            {"origin":"10.0.0.2","destination":"10.0.0.3","pingTime":12.5},
            {"origin":"10.0.0.3","destination":"10.0.0.4","pingTime":7.6}
        ]"#;
        let edges: Vec<Edge> = serde_json::from_str(text).unwrap();
        let pings: Vec<Option<u32>> = edges.iter().map(|e| e.latency_ms).collect();
        assert_eq!(pings, vec![Some(4), Some(12), Some(8)]);
    }

    #[test]
    fn negative_ping_time_is_rejected() {
        let text = r#"{"origin":"a","destination":"b","pingTime":-3}"#;
        assert!(serde_json::from_str::<Edge>(text).is_err());
    }

    #[test]
    fn endpoint_coordinates_need_both_positions() {
        let mut edge = Edge::new("a", "b", Some(5));
        assert!(edge.endpoint_coordinates().is_none());
        let located = GeoInfo {
            country: String::new(),
            region: String::new(),
            city: String::new(),
            latitude: Some(1.0),
            longitude: Some(2.0),
        };
        edge.origin_geo = Some(Some(located.clone()));
        edge.destination_geo = Some(Some(GeoInfo {
            latitude: None,
            ..located.clone()
        }));
        assert!(edge.endpoint_coordinates().is_none());
        edge.destination_geo = Some(Some(located));
        assert_eq!(edge.endpoint_coordinates(), Some(((1.0, 2.0), (1.0, 2.0))));
    }
}
