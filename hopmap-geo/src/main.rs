mod lookup;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use hopmap_core::enrich::{EnrichReport, GeoEnricher, GeoLookup};
use hopmap_core::geozone::GeozoneIndex;
use hopmap_core::plausibility::{self, FilterReport, PlausibilityParams};
use hopmap_core::store::ResultStore;
use hopmap_core::{logging, Config, StoreError};
use log::LevelFilter;

use lookup::HttpGeoLookup;

#[derive(Parser, Debug)]
#[command(about = "Geolocate stored hop edges and drop physically implausible ones")]
struct Args {
    /// JSON config file; missing means defaults
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long)]
    results: Option<PathBuf>,

    #[arg(long)]
    geozones: Option<PathBuf>,

    /// Look up addresses again whose earlier lookup failed
    #[arg(long)]
    retry_failed: bool,

    #[arg(long)]
    speed_multiplier: Option<f64>,

    #[arg(long)]
    max_hop_distance_km: Option<f64>,

    #[arg(long, default_value = "info")]
    log_level: LevelFilter,
}

#[derive(Debug)]
struct Outcome {
    enrich: EnrichReport,
    filter: FilterReport,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    logging::init_logger(args.log_level).context("failed to initialize logger")?;

    let mut cfg = Config::load_or_default(args.config.as_deref())?;
    if let Some(path) = args.results {
        cfg.results_path = path;
    }
    if let Some(path) = args.geozones {
        cfg.geozones_path = path;
    }
    if let Some(m) = args.speed_multiplier {
        cfg.speed_multiplier = m;
    }
    if let Some(km) = args.max_hop_distance_km {
        cfg.max_hop_distance_km = km;
    }
    cfg.retry_failed_lookups |= args.retry_failed;
    cfg.validate()?;

    let store = ResultStore::new(&cfg.results_path);
    let zones = GeozoneIndex::load_or_empty(&cfg.geozones_path);
    let lookup = HttpGeoLookup::new(&cfg.geo_endpoint, Duration::from_secs(cfg.geo_timeout_secs))
        .context("failed to build HTTP client")?;

    let outcome = process(&store, &zones, lookup, &cfg)?;

    println!(
        "\nGeolocated {} address(es) ({} failed, {} cached), updated {} entries",
        outcome.enrich.lookups,
        outcome.enrich.failed_lookups,
        outcome.enrich.cache_hits,
        outcome.enrich.edges_updated
    );
    if outcome.enrich.checkpoint_failures > 0 {
        println!(
            "{} progress save(s) failed; wrote the enriched entries at the end instead",
            outcome.enrich.checkpoint_failures
        );
    }
    println!("Processed {} entries.", outcome.filter.kept);
    if outcome.filter.clamped > 0 {
        println!("Clamped {} ping times.", outcome.filter.clamped);
    }
    println!("Updated {}", store.path().display());
    Ok(())
}

/// Enriches the stored edges in place, then filters them. The result is saved
/// when the filter changed something or a progress save was lost.
fn process<L: GeoLookup>(
    store: &ResultStore,
    zones: &GeozoneIndex,
    lookup: L,
    cfg: &Config,
) -> Result<Outcome, StoreError> {
    let mut edges = store.load()?;
    log::info!("loaded {} entries from {}", edges.len(), store.path().display());

    let mut enricher = GeoEnricher::new(lookup).retry_failed(cfg.retry_failed_lookups);
    let enrich = enricher.enrich(&mut edges, |all| store.save(all));

    let params = PlausibilityParams::from(cfg);
    let (kept, filter) = plausibility::apply(edges, zones, &params);
    if filter.changed() || enrich.checkpoint_failures > 0 {
        store.save(&kept)?;
    }
    Ok(Outcome { enrich, filter })
}
