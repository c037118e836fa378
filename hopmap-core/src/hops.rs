use crate::constants::{DEFAULT_HOP_FLOOR, UNKNOWN_ORIGIN};
use crate::{Edge, Hop};

/// Builds the edges of one probe run.
///
/// Hops numbered at or below `hop_floor` are dropped first; the floor is never
/// lower than 1, so the prober's own gateway is never recorded.
pub fn build_edges(hops: &[Hop], hop_floor: u32, run_id: Option<&str>) -> Vec<Edge> {
    let kept = privacy_filter(hops, hop_floor);
    link_hops(&kept)
        .into_iter()
        .map(|edge| edge.with_run_id(run_id))
        .collect()
}

pub fn privacy_filter(hops: &[Hop], hop_floor: u32) -> Vec<Hop> {
    let floor = hop_floor.max(DEFAULT_HOP_FLOOR);
    hops.iter()
        .filter(|hop| hop.hop_number > floor)
        .cloned()
        .collect()
}

/// The first hop is linked from the `"unknown"` origin with its own latency.
/// Later edges carry the latency contributed by the link itself. Consecutive
/// hops at the same address produce no edge.
pub fn link_hops(hops: &[Hop]) -> Vec<Edge> {
    let mut out = Vec::with_capacity(hops.len());
    let mut prev: Option<&Hop> = None;
    for hop in hops {
        match prev {
            None => out.push(Edge::new(UNKNOWN_ORIGIN, hop.address.clone(), hop.latency_ms)),
            Some(p) if p.address == hop.address => {}
            Some(p) => out.push(Edge::new(
                p.address.clone(),
                hop.address.clone(),
                link_latency_ms(p.latency_ms, hop.latency_ms),
            )),
        }
        prev = Some(hop);
    }
    out
}

fn link_latency_ms(prev: Option<u32>, current: Option<u32>) -> Option<u32> {
    match (prev, current) {
        (Some(p), Some(c)) => Some(p.abs_diff(c)),
        (None, Some(c)) => Some(c),
        (_, None) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hop(n: u32, addr: &str, ms: Option<u32>) -> Hop {
        Hop {
            hop_number: n,
            address: addr.to_string(),
            latency_ms: ms,
        }
    }

    fn summary(edges: &[Edge]) -> Vec<(&str, &str, Option<u32>)> {
        edges
            .iter()
            .map(|e| (e.origin.as_str(), e.destination.as_str(), e.latency_ms))
            .collect()
    }

    #[test]
    fn link_hops_derives_per_link_latency() {
        let hops = [hop(1, "A", Some(10)), hop(2, "B", Some(15)), hop(3, "C", Some(12))];
        let edges = link_hops(&hops);
        assert_eq!(
            summary(&edges),
            vec![("unknown", "A", Some(10)), ("A", "B", Some(5)), ("B", "C", Some(3))]
        );
    }

    #[test]
    fn missing_latencies_follow_link_rules() {
        let hops = [
            hop(2, "A", None),
            hop(3, "B", Some(20)),
            hop(4, "C", None),
            hop(5, "D", Some(7)),
        ];
        let edges = link_hops(&hops);
        assert_eq!(
            summary(&edges),
            vec![
                ("unknown", "A", None),
                ("A", "B", Some(20)),
                ("B", "C", None),
                ("C", "D", Some(7)),
            ]
        );
    }

    #[test]
    fn first_hop_never_appears() {
        let hops = [hop(1, "192.168.1.1", Some(1)), hop(2, "B", Some(9)), hop(3, "C", Some(12))];
        for floor in [0, 1] {
            let edges = build_edges(&hops, floor, None);
            assert!(edges
                .iter()
                .all(|e| e.origin != "192.168.1.1" && e.destination != "192.168.1.1"));
            assert_eq!(summary(&edges), vec![("unknown", "B", Some(9)), ("B", "C", Some(3))]);
        }
    }

    #[test]
    fn higher_floor_drops_more_hops() {
        let hops = [hop(1, "A", Some(1)), hop(2, "B", Some(4)), hop(3, "C", Some(6))];
        let edges = build_edges(&hops, 2, Some("run-1"));
        assert_eq!(summary(&edges), vec![("unknown", "C", Some(6))]);
        assert_eq!(edges[0].run_id.as_deref(), Some("run-1"));
    }

    #[test]
    fn gaps_are_not_interpolated() {
        let hops = [hop(2, "B", Some(5)), hop(5, "E", Some(9))];
        let edges = build_edges(&hops, 1, None);
        assert_eq!(summary(&edges), vec![("unknown", "B", Some(5)), ("B", "E", Some(4))]);
    }

    #[test]
    fn repeated_address_produces_no_self_edge() {
        let hops = [hop(2, "B", Some(5)), hop(3, "B", Some(6)), hop(4, "C", Some(10))];
        let edges = link_hops(&hops);
        assert!(edges.iter().all(|e| e.origin != e.destination));
        assert_eq!(summary(&edges), vec![("unknown", "B", Some(5)), ("B", "C", Some(4))]);
    }

    #[test]
    fn empty_input_builds_nothing() {
        assert!(build_edges(&[], 1, None).is_empty());
        assert!(build_edges(&[hop(1, "A", Some(1))], 1, None).is_empty());
    }
}
