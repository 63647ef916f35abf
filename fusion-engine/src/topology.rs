//! Workload topology analysis.
//!
//! Normalizes a directed node/edge graph and computes the structural
//! metrics the rest of the pipeline consumes: density, centrality
//! hotspots, shortest-path diameter, and a cycle-tolerant dependency
//! ordering. Duplicate edges are kept as-is — density reflects whatever
//! the catalog produced, and callers that want dedup do it upstream.

use std::collections::{HashMap, HashSet, VecDeque};

use serde::Serialize;
use tracing::debug;

use fusion_common::types::{clamp_unit, FusionBundle, FusionTopology, TopologyEdge, TopologyNode};

use crate::catalog::CommandCatalog;

/// Number of centrality hotspots reported.
const HOTSPOT_COUNT: usize = 3;

/// Structural metrics for a normalized topology.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TopologyInsights {
    /// Maximum finite shortest-path hop count over all ordered node pairs.
    pub diameter: usize,
    /// Edge density in [0.0, 1.0] for a directed graph without self-loops.
    pub density: f64,
    /// Top nodes by total degree, ties broken by ascending id.
    pub centrality_hotspots: Vec<String>,
    /// Mean edge latency in milliseconds (0 when there are no edges).
    pub average_latency_ms: f64,
}

/// Normalize a topology in preparation for analysis.
///
/// Trims labels, dedupes parent/child lists, clamps weights to [0,1],
/// drops edges referencing unknown nodes, and clamps latency/penalty
/// floors. Duplicate edges between the same pair survive normalization.
pub fn normalize(topology: &FusionTopology) -> FusionTopology {
    let nodes: Vec<TopologyNode> = topology
        .nodes
        .iter()
        .map(|node| TopologyNode {
            id: node.id.trim().to_string(),
            label: node.label.trim().to_string(),
            weight: clamp_unit(node.weight),
            parents: dedupe_preserving_order(&node.parents),
            children: dedupe_preserving_order(&node.children),
        })
        .collect();

    let known: HashSet<&str> = nodes.iter().map(|n| n.id.as_str()).collect();

    let edges: Vec<TopologyEdge> = topology
        .edges
        .iter()
        .filter(|edge| {
            let keep = known.contains(edge.from.as_str()) && known.contains(edge.to.as_str());
            if !keep {
                debug!(from = %edge.from, to = %edge.to, "dropping edge with unknown endpoint");
            }
            keep
        })
        .map(|edge| TopologyEdge {
            from: edge.from.clone(),
            to: edge.to.clone(),
            latency_ms: edge.latency_ms.max(1),
            risk_penalty: edge.risk_penalty.max(0.0),
        })
        .collect();

    FusionTopology { nodes, edges }
}

/// Analyze a topology, normalizing it first.
pub fn analyze(topology: &FusionTopology) -> TopologyInsights {
    let normalized = normalize(topology);
    let node_count = normalized.nodes.len();
    let edge_count = normalized.edges.len();

    let density = if node_count < 2 {
        0.0
    } else {
        let possible = (node_count * (node_count - 1)) as f64;
        (edge_count as f64 / possible).min(1.0)
    };

    let average_latency_ms = if edge_count == 0 {
        0.0
    } else {
        normalized
            .edges
            .iter()
            .map(|e| e.latency_ms as f64)
            .sum::<f64>()
            / edge_count as f64
    };

    TopologyInsights {
        diameter: diameter(&normalized),
        density,
        centrality_hotspots: centrality_hotspots(&normalized),
        average_latency_ms,
    }
}

/// Maximum finite BFS distance over all ordered node pairs.
///
/// Pairs with no path are treated as infinite and excluded from the max.
fn diameter(topology: &FusionTopology) -> usize {
    let adjacency = adjacency(topology);
    let mut max_hops = 0usize;

    for node in &topology.nodes {
        let mut distances: HashMap<&str, usize> = HashMap::new();
        let mut queue = VecDeque::new();
        distances.insert(node.id.as_str(), 0);
        queue.push_back(node.id.as_str());

        while let Some(current) = queue.pop_front() {
            let hops = distances[current];
            max_hops = max_hops.max(hops);
            if let Some(next) = adjacency.get(current) {
                for neighbor in next {
                    if !distances.contains_key(neighbor.as_str()) {
                        distances.insert(neighbor.as_str(), hops + 1);
                        queue.push_back(neighbor.as_str());
                    }
                }
            }
        }
    }

    max_hops
}

/// Top nodes by total degree (in + out), ties by ascending id.
fn centrality_hotspots(topology: &FusionTopology) -> Vec<String> {
    let mut degrees: HashMap<&str, usize> = topology
        .nodes
        .iter()
        .map(|n| (n.id.as_str(), 0usize))
        .collect();
    for edge in &topology.edges {
        if let Some(out) = degrees.get_mut(edge.from.as_str()) {
            *out += 1;
        }
        if let Some(inbound) = degrees.get_mut(edge.to.as_str()) {
            *inbound += 1;
        }
    }

    let mut ranked: Vec<(&str, usize)> = degrees.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    ranked
        .into_iter()
        .take(HOTSPOT_COUNT)
        .map(|(id, _)| id.to_string())
        .collect()
}

/// Best-effort topological ordering of node ids.
///
/// Kahn's algorithm seeded by zero-indegree nodes, followed by an orphan
/// pass that appends every node the traversal never reached. A cyclic
/// topology therefore still yields a complete ordering — this is a
/// linearization, not a validity proof.
pub fn dependency_order(topology: &FusionTopology) -> Vec<String> {
    let normalized = normalize(topology);
    let adjacency = adjacency(&normalized);

    let mut indegree: HashMap<&str, usize> = normalized
        .nodes
        .iter()
        .map(|n| (n.id.as_str(), 0usize))
        .collect();
    for edge in &normalized.edges {
        if let Some(count) = indegree.get_mut(edge.to.as_str()) {
            *count += 1;
        }
    }

    let mut queue: VecDeque<&str> = normalized
        .nodes
        .iter()
        .filter(|n| indegree.get(n.id.as_str()) == Some(&0))
        .map(|n| n.id.as_str())
        .collect();

    let mut ordered: Vec<String> = Vec::with_capacity(normalized.nodes.len());
    let mut seen: HashSet<&str> = queue.iter().copied().collect();

    while let Some(current) = queue.pop_front() {
        ordered.push(current.to_string());
        if let Some(next) = adjacency.get(current) {
            for neighbor in next {
                if let Some(count) = indegree.get_mut(neighbor.as_str()) {
                    *count = count.saturating_sub(1);
                    if *count == 0 && seen.insert(neighbor.as_str()) {
                        queue.push_back(neighbor.as_str());
                    }
                }
            }
        }
    }

    // Orphan pass: nodes inside cycles never hit indegree zero.
    for node in &normalized.nodes {
        if !ordered.iter().any(|id| id == &node.id) {
            ordered.push(node.id.clone());
        }
    }

    ordered
}

/// Build the per-evaluation topology from a wave bundle and its catalog.
///
/// One node per wave weighted by its score, chained in plan order; edge
/// latency reflects the inter-window gap and the risk penalty reflects
/// how weak the downstream wave's catalog actions score.
pub fn derive_topology(bundle: &FusionBundle, catalog: &CommandCatalog) -> FusionTopology {
    let mut nodes: Vec<TopologyNode> = Vec::with_capacity(bundle.waves.len());
    let mut edges: Vec<TopologyEdge> = Vec::new();

    for (index, wave) in bundle.waves.iter().enumerate() {
        let parents = if index == 0 {
            Vec::new()
        } else {
            vec![bundle.waves[index - 1].id.as_str().to_string()]
        };
        let children = match bundle.waves.get(index + 1) {
            Some(next) => vec![next.id.as_str().to_string()],
            None => Vec::new(),
        };
        nodes.push(TopologyNode {
            id: wave.id.as_str().to_string(),
            label: wave
                .metadata
                .get("label")
                .cloned()
                .unwrap_or_else(|| wave.id.as_str().to_string()),
            weight: clamp_unit(wave.score),
            parents,
            children,
        });

        if index > 0 {
            let previous = &bundle.waves[index - 1];
            let gap_ms = (wave.window_start - previous.window_end)
                .num_milliseconds()
                .max(1) as u64;
            edges.push(TopologyEdge {
                from: previous.id.as_str().to_string(),
                to: wave.id.as_str().to_string(),
                latency_ms: gap_ms,
                risk_penalty: (1.0 - catalog.mean_action_score(&wave.id)).max(0.0),
            });
        }
    }

    FusionTopology { nodes, edges }
}

fn adjacency(topology: &FusionTopology) -> HashMap<String, Vec<String>> {
    let mut adjacency: HashMap<String, Vec<String>> = HashMap::new();
    for edge in &topology.edges {
        adjacency
            .entry(edge.from.clone())
            .or_default()
            .push(edge.to.clone());
    }
    adjacency
}

fn dedupe_preserving_order(values: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    values
        .iter()
        .filter(|v| seen.insert(v.as_str()))
        .cloned()
        .collect()
}
