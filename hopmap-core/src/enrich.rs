use std::collections::HashMap;

use crate::constants::UNKNOWN_ORIGIN;
use crate::error::{LookupError, StoreError};
use crate::{Edge, GeoInfo};

pub trait GeoLookup {
    fn lookup(&mut self, address: &str) -> Result<GeoInfo, LookupError>;
}

impl<F> GeoLookup for F
where
    F: FnMut(&str) -> Result<GeoInfo, LookupError>,
{
    fn lookup(&mut self, address: &str) -> Result<GeoInfo, LookupError> {
        self(address)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EnrichReport {
    pub lookups: usize,
    pub failed_lookups: usize,
    pub cache_hits: usize,
    pub edges_updated: usize,
    pub checkpoint_failures: usize,
}

pub struct GeoEnricher<L> {
    lookup: L,
    cache: HashMap<String, Option<GeoInfo>>,
    retry_failed: bool,
}

impl<L: GeoLookup> GeoEnricher<L> {
    pub fn new(lookup: L) -> Self {
        Self {
            lookup,
            cache: HashMap::new(),
            retry_failed: false,
        }
    }

    pub fn retry_failed(mut self, retry: bool) -> Self {
        self.retry_failed = retry;
        self
    }

    pub fn cached(&self, address: &str) -> Option<&Option<GeoInfo>> {
        self.cache.get(address)
    }

    pub fn enrich<F>(&mut self, edges: &mut [Edge], mut checkpoint: F) -> EnrichReport
    where
        F: FnMut(&[Edge]) -> Result<(), StoreError>,
    {
        if self.retry_failed {
            clear_failed(edges);
        }
        self.seed(edges);

        let mut report = EnrichReport::default();
        let total = edges.len();
        for i in 0..total {
            let edge = &mut edges[i];
            let mut updated = false;
            if edge.origin_geo.is_none() && is_resolvable(&edge.origin) {
                edge.origin_geo = Some(self.resolve(&edge.origin, &mut report));
                updated = true;
            }
            if edge.destination_geo.is_none() && is_resolvable(&edge.destination) {
                edge.destination_geo = Some(self.resolve(&edge.destination, &mut report));
                updated = true;
            }
            if !updated {
                continue;
            }
            report.edges_updated += 1;
            match checkpoint(&*edges) {
                Ok(()) => log::debug!("saved progress: entry {}/{}", i + 1, total),
                Err(err) => {
                    report.checkpoint_failures += 1;
                    log::error!("checkpoint after entry {}/{} failed: {err}", i + 1, total);
                }
            }
        }
        report
    }

    fn seed(&mut self, edges: &[Edge]) {
        for edge in edges {
            for (address, slot) in [
                (&edge.origin, &edge.origin_geo),
                (&edge.destination, &edge.destination_geo),
            ] {
                if let Some(Some(geo)) = slot {
                    if is_resolvable(address) {
                        self.cache
                            .entry(address.clone())
                            .or_insert_with(|| Some(geo.clone()));
                    }
                }
            }
        }
    }

    fn resolve(&mut self, address: &str, report: &mut EnrichReport) -> Option<GeoInfo> {
        if let Some(hit) = self.cache.get(address) {
            report.cache_hits += 1;
            return hit.clone();
        }
        report.lookups += 1;
        let result = match self.lookup.lookup(address) {
            Ok(geo) => Some(geo),
            Err(err) => {
                report.failed_lookups += 1;
                log::warn!("geolocation for {address} failed: {err}");
                None
            }
        };
        self.cache.insert(address.to_string(), result.clone());
        result
    }
}

fn is_resolvable(address: &str) -> bool {
    !address.is_empty() && address != UNKNOWN_ORIGIN
}

fn clear_failed(edges: &mut [Edge]) {
    for edge in edges {
        if edge.origin_geo == Some(None) {
            edge.origin_geo = None;
        }
        if edge.destination_geo == Some(None) {
            edge.destination_geo = None;
        }
    }
}
