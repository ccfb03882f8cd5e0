//! Cluster pipe trees (spec.md §4.7 step 1–3): the minimum spanning tree of a cluster's
//! members (induced from the metric graph), oriented outward from the cluster center.
//!
//! Grounded on the teacher's arena-graph style (`Topology`'s `id2idx` table): the tree is
//! a `petgraph::DiGraph` over an id→index table built once, rather than a pointer tree.

use petgraph::graph::{DiGraph, NodeIndex};
use rustc_hash::FxHashMap;
use serde::Serialize;

use crate::graph::MetricGraph;
use crate::ident::{BuildingId, RoadSegmentId};

#[derive(Debug, Clone, Serialize)]
pub struct TreeEdge {
    pub length: f64,
    pub segment_ids: Vec<RoadSegmentId>,
}

/// A cluster's pipe tree: directed from the cluster center outward to its members.
#[derive(Debug, Clone)]
pub struct ClusterTree {
    pub graph: DiGraph<BuildingId, TreeEdge>,
    pub root: NodeIndex,
    index_of: FxHashMap<BuildingId, NodeIndex>,
}

impl ClusterTree {
    pub fn node_index_of(&self, building: BuildingId) -> Option<NodeIndex> {
        self.index_of.get(&building).copied()
    }

    /// Visits tree edges in post-order (children before parents), the traversal order
    /// the mass-flow propagation needs.
    pub fn post_order_edges(&self) -> Vec<(NodeIndex, NodeIndex, &TreeEdge)> {
        let mut order = Vec::new();
        let mut stack = vec![(self.root, false)];
        let mut visit_order = Vec::new();
        while let Some((node, expanded)) = stack.pop() {
            if expanded {
                visit_order.push(node);
                continue;
            }
            stack.push((node, true));
            for edge in self.graph.edges(node) {
                stack.push((edge.target(), false));
            }
        }
        // `visit_order` is post-order over nodes; recover the edge on each node's way up.
        for &node in &visit_order {
            if let Some(parent_edge) = self
                .graph
                .edges_directed(node, petgraph::Direction::Incoming)
                .next()
            {
                order.push((parent_edge.source(), node, parent_edge.weight()));
            }
        }
        order
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TreeError {
    #[error("cluster center {center} is not a member of its own cluster")]
    CenterNotMember { center: BuildingId },

    #[error("no metric-graph edge between {a} and {b}; cluster members must be pairwise reachable")]
    Unreachable { a: BuildingId, b: BuildingId },
}

/// Builds the cluster's pipe tree: Prim's MST over the induced complete subgraph of
/// `metric_graph` on `members`, then oriented outward from `center` by depth-first
/// traversal. `members` must include `center` and have at least two entries; callers
/// handle the single-member case (no pipe tree, fixed cost only) before calling this.
pub fn build_cluster_tree(
    metric_graph: &MetricGraph,
    members: &[BuildingId],
    center: BuildingId,
) -> Result<ClusterTree, TreeError> {
    if !members.contains(&center) {
        return Err(TreeError::CenterNotMember { center });
    }

    // Prim's algorithm: grow the MST from `center`, always adding the cheapest edge
    // leaving the tree.
    let mut in_tree = vec![false; members.len()];
    let center_pos = members.iter().position(|&b| b == center).unwrap();
    in_tree[center_pos] = true;
    let mut mst_edges: Vec<(usize, usize, f64)> = Vec::with_capacity(members.len() - 1);

    for _ in 1..members.len() {
        let mut best: Option<(usize, usize, f64)> = None;
        for (i, &in_i) in in_tree.iter().enumerate() {
            if !in_i {
                continue;
            }
            for (j, &in_j) in in_tree.iter().enumerate() {
                if in_j {
                    continue;
                }
                if let Some(w) = metric_graph.distance(members[i], members[j]) {
                    if best.map(|(_, _, bw)| w < bw).unwrap_or(true) {
                        best = Some((i, j, w));
                    }
                }
            }
        }
        let (i, j, _) = best.ok_or(TreeError::Unreachable {
            a: members[center_pos],
            b: center,
        })?;
        in_tree[j] = true;
        mst_edges.push((i, j, 0.0));
    }

    // Build the undirected MST, then orient it outward from `center` via DFS.
    let mut graph: DiGraph<BuildingId, TreeEdge> = DiGraph::new();
    let mut index_of: FxHashMap<BuildingId, NodeIndex> = FxHashMap::default();
    for &b in members {
        index_of.insert(b, graph.add_node(b));
    }
    // Adjacency among member positions (undirected), to be oriented by DFS from center.
    let mut adjacency: Vec<Vec<usize>> = vec![Vec::new(); members.len()];
    for &(i, j, _) in &mst_edges {
        adjacency[i].push(j);
        adjacency[j].push(i);
    }

    let mut visited = vec![false; members.len()];
    let mut stack = vec![center_pos];
    visited[center_pos] = true;
    while let Some(u) = stack.pop() {
        for &v in &adjacency[u] {
            if visited[v] {
                continue;
            }
            visited[v] = true;
            let edge = metric_graph
                .edge(members[u], members[v])
                .ok_or(TreeError::Unreachable {
                    a: members[u],
                    b: members[v],
                })?;
            graph.add_edge(
                index_of[&members[u]],
                index_of[&members[v]],
                TreeEdge {
                    length: edge.length,
                    segment_ids: edge.segment_ids.clone(),
                },
            );
            stack.push(v);
        }
    }

    Ok(ClusterTree {
        graph,
        root: index_of[&center],
        index_of,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::building::Building;
    use crate::config::Config;
    use crate::geometry::Point2;
    use crate::graph::{build_metric_graph, RoadGraphBuilder};
    use crate::ident::RoadSegmentId;
    use crate::road::RoadSegment;
    use crate::units::{Currency, KiloWattHours, KiloWatts};

    fn line_of_three() -> (Vec<RoadSegment>, Vec<Building>) {
        let mk = |id, x| {
            Building::new(
                BuildingId::new(id),
                Point2::new(x, 0.0),
                KiloWatts::new(10.0),
                KiloWattHours::new(0.0),
            )
        };
        let buildings = vec![mk(0, 0.0), mk(1, 50.0), mk(2, 100.0)];
        let segs = vec![RoadSegment::new(
            RoadSegmentId::new(0),
            Point2::new(0.0, 0.0),
            Point2::new(100.0, 0.0),
            "residential",
        )];
        (segs, buildings)
    }

    fn default_config() -> Config {
        Config::builder()
            .heat_capacity(KiloWatts::new(100.0))
            .fixed_cost(Currency::new(1000.0))
            .trench_cost_per_cubic_m(Currency::new(50.0))
            .eps(10.0)
            .build()
    }

    #[test]
    fn tree_rooted_at_center_reaches_every_member() {
        let (segs, buildings) = line_of_three();
        let rg = RoadGraphBuilder::new().build(&segs, &buildings).unwrap();
        let mg = build_metric_graph(&rg, &buildings, &default_config());
        let members: Vec<BuildingId> = buildings.iter().map(|b| b.id).collect();
        let tree = build_cluster_tree(&mg, &members, BuildingId::new(1)).unwrap();
        assert_eq!(tree.graph.node_count(), 3);
        assert_eq!(tree.graph.edge_count(), 2);
        for &b in &members {
            assert!(tree.node_index_of(b).is_some());
        }
    }

    #[test]
    fn post_order_visits_leaves_before_root() {
        let (segs, buildings) = line_of_three();
        let rg = RoadGraphBuilder::new().build(&segs, &buildings).unwrap();
        let mg = build_metric_graph(&rg, &buildings, &default_config());
        let members: Vec<BuildingId> = buildings.iter().map(|b| b.id).collect();
        let tree = build_cluster_tree(&mg, &members, BuildingId::new(1)).unwrap();
        let edges = tree.post_order_edges();
        assert_eq!(edges.len(), 2);
    }

    #[test]
    fn tree_shape_matches_snapshot() {
        let (segs, buildings) = line_of_three();
        let rg = RoadGraphBuilder::new().build(&segs, &buildings).unwrap();
        let mg = build_metric_graph(&rg, &buildings, &default_config());
        let members: Vec<BuildingId> = buildings.iter().map(|b| b.id).collect();
        let tree = build_cluster_tree(&mg, &members, BuildingId::new(1)).unwrap();
        insta::assert_yaml_snapshot!(tree.graph);
    }
}
