//! The shortest-path metric graph (spec.md §4.2): a complete graph over building nodes
//! whose edges carry road-following shortest-path distances, the underlying road-segment
//! IDs, and a street-type cost factor.
//!
//! Grounded on `parsimon_core::routing::BfsRoutes::new`: one traversal per source node,
//! fanned out across `rayon` chunks and merged into a dense matrix. Dijkstra replaces BFS
//! here because road-graph edges are weighted.

use std::collections::BinaryHeap;
use std::cmp::Ordering;

use petgraph::graph::NodeIndex;
use petgraph::visit::EdgeRef;
use rayon::prelude::*;
use rustc_hash::FxHashMap;

use crate::building::Building;
use crate::config::Config;
use crate::graph::road_graph::RoadGraph;
use crate::ident::{BuildingId, RoadSegmentId};

/// An edge of the metric graph `G_m` (spec.md §3).
#[derive(Debug, Clone)]
pub struct MetricEdge {
    /// The shortest road-following path length, `w_ij`.
    pub length: f64,
    /// The concatenated ordered list of road-segment IDs along the shortest path.
    pub segment_ids: Vec<RoadSegmentId>,
    /// The length-weighted average of per-segment type multipliers, `f_ij`.
    pub cost_factor: f64,
}

impl MetricEdge {
    /// The cost-weighted adjacency value used by the first-stage clusterer: `w_ij * f_ij`.
    pub fn cost_weighted_distance(&self) -> f64 {
        self.length * self.cost_factor
    }
}

/// The complete metric graph over building nodes (spec.md §3).
#[derive(Debug, Clone)]
pub struct MetricGraph {
    building_ids: Vec<BuildingId>,
    index_of: FxHashMap<BuildingId, usize>,
    /// Upper-triangular dense matrix of edges; `None` when unreachable.
    matrix: Vec<Vec<Option<MetricEdge>>>,
}

impl MetricGraph {
    pub fn building_ids(&self) -> &[BuildingId] {
        &self.building_ids
    }

    pub fn len(&self) -> usize {
        self.building_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.building_ids.is_empty()
    }

    fn local_index(&self, id: BuildingId) -> Option<usize> {
        self.index_of.get(&id).copied()
    }

    /// Returns the metric edge between two (possibly equal) buildings, `None` if
    /// unreachable or if either building is unknown.
    pub fn edge(&self, a: BuildingId, b: BuildingId) -> Option<&MetricEdge> {
        if a == b {
            return None;
        }
        let (i, j) = (self.local_index(a)?, self.local_index(b)?);
        let (lo, hi) = if i < j { (i, j) } else { (j, i) };
        self.matrix[lo][hi - lo].as_ref()
    }

    pub fn distance(&self, a: BuildingId, b: BuildingId) -> Option<f64> {
        self.edge(a, b).map(|e| e.length)
    }

    pub fn cost_weighted_distance(&self, a: BuildingId, b: BuildingId) -> Option<f64> {
        self.edge(a, b).map(|e| e.cost_weighted_distance())
    }

    /// Reconstructs a metric graph directly from its persisted nodes and edges
    /// (`Config::load_graph`), bypassing the Dijkstra recomputation `build_metric_graph`
    /// would otherwise perform.
    pub fn from_parts(
        building_ids: Vec<BuildingId>,
        edges: impl IntoIterator<Item = (BuildingId, BuildingId, MetricEdge)>,
    ) -> Self {
        let index_of: FxHashMap<BuildingId, usize> = building_ids
            .iter()
            .enumerate()
            .map(|(i, &id)| (id, i))
            .collect();
        let n = building_ids.len();
        let mut matrix: Vec<Vec<Option<MetricEdge>>> =
            (0..n).map(|i| vec![None; n - i]).collect();

        for (a, b, edge) in edges {
            let (Some(&i), Some(&j)) = (index_of.get(&a), index_of.get(&b)) else {
                continue;
            };
            let (lo, hi) = if i < j { (i, j) } else { (j, i) };
            matrix[lo][hi - lo] = Some(edge);
        }

        Self {
            building_ids,
            index_of,
            matrix,
        }
    }
}

/// Builds the metric graph from a road graph and the ordered list of buildings it serves.
pub fn build_metric_graph(
    road_graph: &RoadGraph,
    buildings: &[Building],
    config: &Config,
) -> MetricGraph {
    let building_ids: Vec<BuildingId> = buildings.iter().map(|b| b.id).collect();
    let index_of: FxHashMap<BuildingId, usize> = building_ids
        .iter()
        .enumerate()
        .map(|(i, &id)| (id, i))
        .collect();
    let n = building_ids.len();

    // One Dijkstra run per source building, fanned out across rayon, following
    // `BfsRoutes::new`'s per-node-parallel-chunk shape.
    let rows: Vec<(usize, Vec<Option<MetricEdge>>)> = (0..n)
        .into_par_iter()
        .map(|i| {
            let source_idx = road_graph
                .building_index(building_ids[i])
                .expect("building missing from road graph");
            let dijkstra = dijkstra_with_paths(road_graph, source_idx);
            let mut row = vec![None; n - i];
            for (j, &target_building) in building_ids.iter().enumerate().skip(i + 1) {
                let target_idx = road_graph
                    .building_index(target_building)
                    .expect("building missing from road graph");
                if let Some((length, segment_ids)) = dijkstra.path_to(target_idx) {
                    let cost_factor = cost_factor_for_path(road_graph, &segment_ids, config);
                    row[j - i] = Some(MetricEdge {
                        length,
                        segment_ids,
                        cost_factor,
                    });
                }
            }
            (i, row)
        })
        .collect();

    let mut matrix: Vec<Vec<Option<MetricEdge>>> = vec![Vec::new(); n];
    for (i, row) in rows {
        matrix[i] = row;
    }

    MetricGraph {
        building_ids,
        index_of,
        matrix,
    }
}

/// Computes the length-weighted average street-type multiplier along a path (`f_ij` in
/// spec.md §4.2): `sum(len_e * multiplier(e.road_type)) / sum(len_e)` over the edges whose
/// segment IDs intersect `segment_ids`. Access-point-to-building edges contribute zero
/// length and are skipped.
fn cost_factor_for_path(
    road_graph: &RoadGraph,
    segment_ids: &[RoadSegmentId],
    config: &Config,
) -> f64 {
    let mut weighted = 0.0;
    let mut total_len = 0.0;
    for edge in road_graph.graph().edge_weights() {
        if edge.segment_ids.iter().any(|id| segment_ids.contains(id)) {
            let len = edge.weight.into_f64();
            let multiplier = edge
                .road_type
                .as_deref()
                .map(|rt| config.multiplier_for(rt))
                .unwrap_or(1.0);
            weighted += len * multiplier;
            total_len += len;
        }
    }
    if total_len == 0.0 {
        1.0
    } else {
        weighted / total_len
    }
}

struct DijkstraResult {
    dist: FxHashMap<NodeIndex, f64>,
    prev_edge: FxHashMap<NodeIndex, (NodeIndex, Vec<RoadSegmentId>)>,
}

impl DijkstraResult {
    fn path_to(&self, target: NodeIndex) -> Option<(f64, Vec<RoadSegmentId>)> {
        let &dist = self.dist.get(&target)?;
        let mut segment_ids = Vec::new();
        let mut cur = target;
        while let Some((prev, seg_ids)) = self.prev_edge.get(&cur) {
            segment_ids.splice(0..0, seg_ids.iter().copied());
            cur = *prev;
        }
        Some((dist, segment_ids))
    }
}

#[derive(PartialEq)]
struct HeapEntry {
    dist: f64,
    node: NodeIndex,
}

impl Eq for HeapEntry {}

impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed for a min-heap on `dist`.
        other
            .dist
            .partial_cmp(&self.dist)
            .unwrap_or(Ordering::Equal)
    }
}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

fn dijkstra_with_paths(road_graph: &RoadGraph, source: NodeIndex) -> DijkstraResult {
    let mut dist: FxHashMap<NodeIndex, f64> = FxHashMap::default();
    let mut prev_edge: FxHashMap<NodeIndex, (NodeIndex, Vec<RoadSegmentId>)> = FxHashMap::default();
    let mut visited: FxHashMap<NodeIndex, bool> = FxHashMap::default();
    let mut heap = BinaryHeap::new();

    dist.insert(source, 0.0);
    heap.push(HeapEntry {
        dist: 0.0,
        node: source,
    });

    while let Some(HeapEntry { dist: d, node: u }) = heap.pop() {
        if visited.get(&u).copied().unwrap_or(false) {
            continue;
        }
        visited.insert(u, true);
        for edge in road_graph.graph().edges(u) {
            let v = edge.target();
            let w = edge.weight().weight.into_f64();
            let nd = d + w;
            if nd < dist.get(&v).copied().unwrap_or(f64::INFINITY) {
                dist.insert(v, nd);
                prev_edge.insert(v, (u, edge.weight().segment_ids.clone()));
                heap.push(HeapEntry { dist: nd, node: v });
            }
        }
    }

    DijkstraResult { dist, prev_edge }
}
