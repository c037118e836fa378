mod probe;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use hopmap_core::constants::RUN_ID_HEX_DIGITS;
use hopmap_core::hops::build_edges;
use hopmap_core::parse::ProbeFormat;
use hopmap_core::store::ResultStore;
use hopmap_core::targets::load_targets;
use hopmap_core::{logging, Config, Edge};
use log::LevelFilter;
use rand::Rng;

use probe::{run_probe, ProbeCredential};

#[derive(Parser, Debug)]
#[command(about = "Traceroute a list of targets and merge the hop edges into the result store")]
struct Args {
    /// JSON config file; missing means defaults
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long)]
    targets: Option<PathBuf>,

    #[arg(long)]
    results: Option<PathBuf>,

    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Output dialect to parse; defaults to the host platform's
    #[arg(long, value_enum)]
    format: Option<FormatArg>,

    #[arg(long, default_value = "info")]
    log_level: LevelFilter,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum FormatArg {
    Unix,
    Windows,
}

impl From<FormatArg> for ProbeFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Unix => ProbeFormat::Unix,
            FormatArg::Windows => ProbeFormat::Windows,
        }
    }
}

#[derive(Debug, Default)]
struct RunSummary {
    succeeded: usize,
    failed: usize,
    edges: Vec<Edge>,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    logging::init_logger(args.log_level).context("failed to initialize logger")?;

    let mut cfg = Config::load_or_default(args.config.as_deref())?;
    if let Some(path) = args.targets {
        cfg.targets_path = path;
    }
    if let Some(path) = args.results {
        cfg.results_path = path;
    }
    if let Some(secs) = args.timeout_secs {
        cfg.probe_timeout_secs = secs;
    }
    cfg.validate()?;
    let format = args.format.map(ProbeFormat::from).unwrap_or_else(ProbeFormat::native);

    let targets = load_targets(&cfg.targets_path);
    if targets.is_empty() {
        println!(
            "No targets found. Please ensure {} contains an array of IPv4 addresses.",
            cfg.targets_path.display()
        );
        return Ok(());
    }
    println!("Found {} target(s) to traceroute", targets.len());

    let credential = ProbeCredential::from_env();
    let summary = probe_targets(&cfg, &targets, format, credential.as_ref());
    drop(credential);

    if summary.edges.is_empty() {
        println!("\nNo results to save - all traceroutes failed or returned no parseable hops");
        println!("Summary: {} target(s) failed", summary.failed);
        return Ok(());
    }

    let store = ResultStore::new(&cfg.results_path);
    let collected = summary.edges.len();
    let report = store
        .merge(summary.edges, cfg.merge_key)
        .with_context(|| format!("failed to save {}", store.path().display()))?;
    println!(
        "\nCollected {} hop edge(s): {} new, {} already stored ({} total in {})",
        collected,
        report.added,
        report.skipped,
        report.existing + report.added,
        store.path().display()
    );
    println!(
        "Summary: {} target(s) succeeded, {} target(s) failed",
        summary.succeeded, summary.failed
    );
    Ok(())
}

fn probe_targets(
    cfg: &Config,
    targets: &[String],
    format: ProbeFormat,
    credential: Option<&ProbeCredential>,
) -> RunSummary {
    let timeout = Duration::from_secs(cfg.probe_timeout_secs);
    let mut rng = rand::thread_rng();
    let mut summary = RunSummary::default();

    for target in targets {
        log::info!("running traceroute to {target}...");
        let run_id = new_run_id(&mut rng);
        let output = match run_probe(target, format, timeout, credential) {
            Ok(output) => output,
            Err(err) => {
                log::warn!("traceroute to {target} failed: {err}");
                summary.failed += 1;
                continue;
            }
        };
        let edges = edges_from_output(&output, format, cfg.effective_hop_floor(), &run_id);
        if edges.is_empty() {
            log::warn!("no hops found for {target}");
            summary.failed += 1;
            continue;
        }
        log::info!("processed {} hops for {target} (run {run_id})", edges.len());
        summary.succeeded += 1;
        summary.edges.extend(edges);
    }
    summary
}

fn edges_from_output(output: &str, format: ProbeFormat, hop_floor: u32, run_id: &str) -> Vec<Edge> {
    let hops = format.parse_output(output.lines());
    let edges = build_edges(&hops, hop_floor, Some(run_id));
    if edges.is_empty() && !hops.is_empty() {
        log::debug!(
            "parsed {} hop(s) but all were at or below hop {}",
            hops.len(),
            hop_floor
        );
    }
    edges
}

fn new_run_id<R: Rng>(rng: &mut R) -> String {
    format!("{:0width$x}", rng.gen::<u64>(), width = RUN_ID_HEX_DIGITS)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TRACEROUTE_OUTPUT: &str = "\
traceroute to 8.8.8.8 (8.8.8.8), 64 hops max, 72 byte packets
 1  router.lan (192.168.1.1)  2.101 ms  1.866 ms  1.712 ms
 2  100.64.0.1 (100.64.0.1)  9.317 ms  8.944 ms  9.120 ms
 3  * * *
 4  ae12.edge.example.net (203.0.113.17)  14.602 ms  13.880 ms  15.002 ms
 5  dns.google (8.8.8.8)  12.030 ms  12.511 ms  12.400 ms
";

    #[test]
    fn edges_skip_local_hop_and_timeouts() {
        let edges = edges_from_output(TRACEROUTE_OUTPUT, ProbeFormat::Unix, 1, "abc");
        let got: Vec<(&str, &str, Option<u32>)> = edges
            .iter()
            .map(|e| (e.origin.as_str(), e.destination.as_str(), e.latency_ms))
            .collect();
        assert_eq!(
            got,
            vec![
                ("unknown", "100.64.0.1", Some(9)),
                ("100.64.0.1", "203.0.113.17", Some(5)),
                ("203.0.113.17", "8.8.8.8", Some(2)),
            ]
        );
        assert!(edges.iter().all(|e| e.run_id.as_deref() == Some("abc")));
    }

    #[test]
    fn tracert_output_uses_windows_dialect() {
        let output = "\
Tracing route to 1.1.1.1 over a maximum of 30 hops

  1    <1 ms    <1 ms    <1 ms  192.168.0.1
  2     8 ms     7 ms     9 ms  10.20.0.1
  3    11 ms    10 ms    12 ms  one.one.one.one [1.1.1.1]

Trace complete.
";
        let edges = edges_from_output(output, ProbeFormat::Windows, 1, "r");
        assert_eq!(edges.len(), 2);
        assert_eq!(edges[0].destination, "10.20.0.1");
        assert_eq!(edges[1].latency_ms, Some(3));
    }

    #[test]
    fn run_ids_are_fixed_width_hex() {
        let mut rng = rand::thread_rng();
        let id = new_run_id(&mut rng);
        assert_eq!(id.len(), RUN_ID_HEX_DIGITS);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
