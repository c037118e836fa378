use crate::config::Config;
use crate::constants::*;
use crate::geometry::{haversine_m, min_latency_ms};
use crate::geozone::GeozoneIndex;
use crate::Edge;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlausibilityParams {
    pub speed_multiplier: f64,
    pub max_hop_distance_km: f64,
    pub print_limit: usize,
}

impl Default for PlausibilityParams {
    fn default() -> Self {
        Self {
            speed_multiplier: DEFAULT_SPEED_MULTIPLIER,
            max_hop_distance_km: DEFAULT_MAX_HOP_DISTANCE_KM,
            print_limit: DEFAULT_PRINT_LIMIT,
        }
    }
}

impl From<&Config> for PlausibilityParams {
    fn from(cfg: &Config) -> Self {
        Self {
            speed_multiplier: cfg.speed_multiplier,
            max_hop_distance_km: cfg.max_hop_distance_km,
            print_limit: cfg.print_limit,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FilterReport {
    pub clamped: usize,
    pub filtered: usize,
    pub bypassed: usize,
    pub kept: usize,
}

impl FilterReport {
    pub fn changed(&self) -> bool {
        self.clamped > 0 || self.filtered > 0 || self.bypassed > 0
    }
}

pub fn clamp_latency(latency_ms: Option<u32>, min_ms: f64) -> Option<u32> {
    let floor = min_ms.ceil().max(0.0) as u32;
    latency_ms.map(|ms| ms.max(floor))
}

struct Notices {
    limit: usize,
    count: usize,
    kind: &'static str,
}

impl Notices {
    fn new(limit: usize, kind: &'static str) -> Self {
        Self { limit, count: 0, kind }
    }

    fn push(&mut self, message: impl FnOnce() -> String) {
        self.count += 1;
        if self.count <= self.limit {
            log::info!("{}", message());
        }
    }

    fn finish(&self) {
        if self.count > self.limit {
            log::info!("... and {} more {}", self.count - self.limit, self.kind);
        }
    }
}

pub fn apply(edges: Vec<Edge>, zones: &GeozoneIndex, params: &PlausibilityParams) -> (Vec<Edge>, FilterReport) {
    let mut clamped = Notices::new(params.print_limit, "clamped");
    let mut filtered = Notices::new(params.print_limit, "filtered");
    let mut bypassed = Notices::new(params.print_limit, "bypassed");
    let mut out = Vec::with_capacity(edges.len());

    for mut edge in edges {
        let Some(((o_lat, o_lon), (d_lat, d_lon))) = edge.endpoint_coordinates() else {
            out.push(edge);
            continue;
        };
        let distance_m = haversine_m(o_lat, o_lon, d_lat, d_lon);
        let distance_km = distance_m / METERS_PER_KM;

        let original = edge.latency_ms;
        let corrected = clamp_latency(original, min_latency_ms(distance_m, params.speed_multiplier));
        if corrected != original {
            edge.latency_ms = corrected;
            clamped.push(|| {
                format!(
                    "clamped ping {}ms -> {}ms (distance: {:.2}km)",
                    original.unwrap_or_default(),
                    corrected.unwrap_or_default(),
                    distance_km
                )
            });
        }

        if distance_km > params.max_hop_distance_km {
            match zones.shared_zone((o_lat, o_lon), (d_lat, d_lon)) {
                Some(zone) => bypassed.push(|| {
                    format!(
                        "bypassed distance filter for hop {} -> {} ({:.2}km) in geozone '{}'",
                        edge.origin,
                        edge.destination,
                        distance_km,
                        zone.label()
                    )
                }),
                None => {
                    filtered.push(|| {
                        format!(
                            "filtered hop {} -> {} ({:.2}km)",
                            edge.origin, edge.destination, distance_km
                        )
                    });
                    continue;
                }
            }
        }
        out.push(edge);
    }

    clamped.finish();
    filtered.finish();
    bypassed.finish();
    if filtered.count > 0 {
        log::info!(
            "filtered {} hop(s) > {}km",
            filtered.count,
            params.max_hop_distance_km
        );
    }
    if bypassed.count > 0 {
        log::info!(
            "bypassed distance limit for {} hop(s) inside a geozone",
            bypassed.count
        );
    }

    let report = FilterReport {
        clamped: clamped.count,
        filtered: filtered.count,
        bypassed: bypassed.count,
        kept: out.len(),
    };
    (out, report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geozone::Geozone;
    use crate::GeoInfo;

    fn located(lat: f64, lon: f64) -> Option<Option<GeoInfo>> {
        Some(Some(GeoInfo {
            country: String::new(),
            region: String::new(),
            city: String::new(),
            latitude: Some(lat),
            longitude: Some(lon),
        }))
    }

    // Points on the equator; 9 degrees of longitude is ~1000.75 km.
    fn equator_edge(lon_a: f64, lon_b: f64, ms: Option<u32>) -> Edge {
        let mut edge = Edge::new("198.51.100.1", "203.0.113.1", ms);
        edge.origin_geo = located(0.0, lon_a);
        edge.destination_geo = located(0.0, lon_b);
        edge
    }

    fn equator_zone() -> GeozoneIndex {
        GeozoneIndex::new(vec![Geozone {
            id: "backbone".into(),
            name: Some("Equatorial backbone".into()),
            polygon: vec![(-1.0, -5.0), (60.0, -5.0), (60.0, 5.0), (-1.0, 5.0)],
        }])
    }

    #[test]
    fn clamp_raises_only_impossible_latencies() {
        let min = min_latency_ms(1_000_000.0, 3.0);
        assert_eq!(clamp_latency(Some(2), min), Some(11));
        assert_eq!(clamp_latency(Some(50), min), Some(50));
        assert_eq!(clamp_latency(None, min), None);
        assert_eq!(clamp_latency(Some(0), 0.0), Some(0));
    }

    #[test]
    fn short_edges_are_clamped_not_dropped() {
        let edges = vec![equator_edge(0.0, 9.0, Some(2)), equator_edge(0.0, 9.0, Some(50))];
        let (out, report) = apply(edges, &GeozoneIndex::default(), &PlausibilityParams::default());
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].latency_ms, Some(11));
        assert_eq!(out[1].latency_ms, Some(50));
        assert_eq!(report, FilterReport { clamped: 1, filtered: 0, bypassed: 0, kept: 2 });
    }

    #[test]
    fn long_edge_without_zone_is_dropped() {
        let edges = vec![equator_edge(0.0, 36.0, Some(80))];
        let (out, report) = apply(edges, &GeozoneIndex::default(), &PlausibilityParams::default());
        assert!(out.is_empty());
        assert_eq!(report.filtered, 1);
        assert!(report.changed());
    }

    #[test]
    fn long_edge_inside_one_zone_is_kept_unchanged() {
        let edges = vec![equator_edge(0.0, 36.0, Some(80))];
        let (out, report) = apply(edges, &equator_zone(), &PlausibilityParams::default());
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].latency_ms, Some(80));
        assert_eq!(report, FilterReport { clamped: 0, filtered: 0, bypassed: 1, kept: 1 });
    }

    #[test]
    fn long_edge_leaving_the_zone_is_dropped() {
        let edges = vec![equator_edge(0.0, -36.0, Some(80))];
        let (out, _) = apply(edges, &equator_zone(), &PlausibilityParams::default());
        assert!(out.is_empty());
    }

    #[test]
    fn edges_without_both_coordinates_pass_through() {
        let mut half = equator_edge(0.0, 36.0, Some(1));
        half.destination_geo = Some(None);
        let pending = Edge::new("unknown", "203.0.113.1", Some(1));
        let (out, report) = apply(
            vec![half.clone(), pending.clone()],
            &GeozoneIndex::default(),
            &PlausibilityParams::default(),
        );
        assert_eq!(out, vec![half, pending]);
        assert!(!report.changed());
    }

    #[test]
    fn second_pass_changes_nothing() {
        let edges = vec![
            equator_edge(0.0, 9.0, Some(2)),
            equator_edge(0.0, 36.0, Some(3)),
            equator_edge(0.0, 1.0, None),
        ];
        let params = PlausibilityParams {
            print_limit: 1,
            ..PlausibilityParams::default()
        };
        let (first, report) = apply(edges, &GeozoneIndex::default(), &params);
        assert_eq!(report.clamped, 2);
        assert_eq!(report.filtered, 1);
        assert_eq!(first[0].latency_ms, Some(11));
        let (second, again) = apply(first.clone(), &GeozoneIndex::default(), &params);
        assert_eq!(second, first);
        assert!(!again.changed());
    }
}
