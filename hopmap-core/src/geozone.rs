//! Named polygonal regions that exempt long links from the distance filter.

use std::fs;
use std::io;
use std::path::Path;

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::GeozoneError;

#[derive(Debug, Clone, PartialEq)]
pub struct Geozone {
    pub id: String,
    pub name: Option<String>,
    /// Outer ring as `(longitude, latitude)` vertices.
    pub polygon: Vec<(f64, f64)>,
}

impl Geozone {
    pub fn label(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }

    /// Ray casting on the outer ring. Points on a vertex count as inside;
    /// rings with fewer than 3 vertices never match.
    pub fn contains(&self, lat: f64, lon: f64) -> bool {
        let n = self.polygon.len();
        if n < 3 {
            return false;
        }
        let (x, y) = (lon, lat);
        let mut inside = false;
        for i in 0..n {
            let (x1, y1) = self.polygon[i];
            let (x2, y2) = self.polygon[(i + 1) % n];
            if (x, y) == (x1, y1) || (x, y) == (x2, y2) {
                return true;
            }
            if (y1 > y) != (y2 > y) && x < (x2 - x1) * (y - y1) / (y2 - y1) + x1 {
                inside = !inside;
            }
        }
        inside
    }
}

#[derive(Debug, Clone, Default)]
pub struct GeozoneIndex {
    zones: Vec<Geozone>,
}

#[derive(Deserialize)]
struct FeatureCollection {
    #[serde(default)]
    features: Vec<Feature>,
}

#[derive(Deserialize)]
struct Feature {
    #[serde(default)]
    properties: Option<Map<String, Value>>,
    #[serde(default)]
    geometry: Option<Geometry>,
}

#[derive(Deserialize)]
struct Geometry {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    coordinates: Value,
}

impl GeozoneIndex {
    pub fn new(zones: Vec<Geozone>) -> Self {
        Self { zones }
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, GeozoneError> {
        let path = path.as_ref();
        let data = fs::read(path).map_err(|source| match source.kind() {
            io::ErrorKind::NotFound => GeozoneError::Missing {
                path: path.to_path_buf(),
            },
            _ => GeozoneError::Io {
                path: path.to_path_buf(),
                source,
            },
        })?;
        let collection: FeatureCollection =
            serde_json::from_slice(&data).map_err(|source| GeozoneError::Format {
                path: path.to_path_buf(),
                source,
            })?;
        Ok(Self::from_features(collection.features))
    }

    /// Like [`GeozoneIndex::load`], but any failure yields an empty index so
    /// the distance-filter bypass is simply disabled.
    pub fn load_or_empty<P: AsRef<Path>>(path: P) -> Self {
        match Self::load(path) {
            Ok(index) => {
                log::info!("loaded {} geozone(s)", index.len());
                index
            }
            Err(GeozoneError::Missing { path }) => {
                log::warn!(
                    "geozone file {} not found; distance filter bypass disabled",
                    path.display()
                );
                Self::default()
            }
            Err(err) => {
                log::error!("{err}; distance filter bypass disabled");
                Self::default()
            }
        }
    }

    fn from_features(features: Vec<Feature>) -> Self {
        let mut zones = Vec::new();
        for (idx, feature) in features.into_iter().enumerate() {
            let Some(geometry) = feature.geometry else { continue };
            if geometry.kind != "Polygon" {
                continue;
            }
            let rings: Vec<Vec<Vec<f64>>> = match serde_json::from_value(geometry.coordinates) {
                Ok(rings) => rings,
                Err(err) => {
                    log::warn!("skipping geozone feature {idx}: bad coordinates: {err}");
                    continue;
                }
            };
            let Some(outer) = rings.into_iter().next() else { continue };
            let polygon = outer
                .into_iter()
                .filter(|pos| pos.len() >= 2)
                .map(|pos| (pos[0], pos[1]))
                .collect();
            let props = feature.properties.unwrap_or_default();
            let id = match props.get("id") {
                Some(Value::String(s)) => s.clone(),
                Some(Value::Number(n)) => n.to_string(),
                _ => format!("#{idx}"),
            };
            let name = props.get("name").and_then(Value::as_str).map(str::to_string);
            zones.push(Geozone { id, name, polygon });
        }
        Self { zones }
    }

    pub fn len(&self) -> usize {
        self.zones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }

    pub fn containing_zone(&self, lat: f64, lon: f64) -> Option<&Geozone> {
        self.zones.iter().find(|zone| zone.contains(lat, lon))
    }

    /// The zone holding both points, if they resolve to the same one.
    pub fn shared_zone(&self, a: (f64, f64), b: (f64, f64)) -> Option<&Geozone> {
        let za = self.containing_zone(a.0, a.1)?;
        let zb = self.containing_zone(b.0, b.1)?;
        (za.id == zb.id).then_some(za)
    }
}
