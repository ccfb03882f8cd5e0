//! The road graph builder (spec.md §4.1): splits road segments at per-building access
//! points and attaches each building to its access point with a zero-length edge.
//!
//! Mirrors `parsimon_core::network::topology::Topology::new`'s shape: an arena-allocated
//! `petgraph::UnGraph` plus an id→index table (`FxHashMap`), built once and then treated
//! as read-only.

use petgraph::graph::{NodeIndex, UnGraph};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::building::Building;
use crate::config::InstallationStrategy;
use crate::geometry::{project_onto_segment, CoordKey, Point2};
use crate::ident::{BuildingId, RoadNodeId, RoadSegmentId};
use crate::road::{RoadSegment, RoadType};
use crate::units::Meters;

/// A segment shorter than this is kept intact even if a building would otherwise split
/// it (spec.md §4.1 edge cases).
pub const POINT_SPACING_TOLERANCE: f64 = 1e-9;

/// The kind of vertex in the road graph (spec.md §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoadNodeKind {
    /// An internal road vertex (a segment endpoint that is not an access point).
    Internal,
    /// The projection of a building centroid onto the nearest road segment.
    AccessPoint { building: BuildingId },
    /// A building's own vertex, reached from its access point by a zero-length edge.
    Building { building: BuildingId },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoadNode {
    pub id: RoadNodeId,
    pub location: Point2,
    pub kind: RoadNodeKind,
}

impl RoadNode {
    pub fn has_access_point(&self) -> bool {
        matches!(self.kind, RoadNodeKind::AccessPoint { .. })
    }

    pub fn building_id(&self) -> Option<BuildingId> {
        match self.kind {
            RoadNodeKind::AccessPoint { building } | RoadNodeKind::Building { building } => {
                Some(building)
            }
            RoadNodeKind::Internal => None,
        }
    }
}

/// An edge of the road graph: either a (sub-)segment of an original road, or a
/// zero-length edge connecting an access point to its building.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoadEdge {
    pub weight: Meters,
    /// The original road-segment IDs this edge derives from (empty for the zero-length
    /// access-point-to-building edges, and for the direct building-to-building edges of
    /// greenfield/adjacent installation strategies).
    pub segment_ids: Vec<RoadSegmentId>,
    /// The road type inherited from the segment this edge derives from, used to look up
    /// the street-type cost multiplier. `None` for edges that carry no street-type cost
    /// (access-point-to-building edges, and direct building-to-building edges).
    pub road_type: Option<RoadType>,
}

/// The road graph `G_r` (spec.md §3): an undirected weighted graph over road nodes and
/// building nodes.
#[derive(Debug, Clone)]
pub struct RoadGraph {
    pub(crate) graph: UnGraph<RoadNode, RoadEdge>,
    pub(crate) id2idx: FxHashMap<RoadNodeId, NodeIndex>,
    pub(crate) building2idx: FxHashMap<BuildingId, NodeIndex>,
}

#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    #[error("no roads were given to the graph builder")]
    NoRoads,

    #[error("no buildings were given to the graph builder")]
    NoBuildings,

    #[error("building {building} has no road in its neighborhood")]
    NoNearbyRoad { building: BuildingId },

    #[error("road segment {segment} is shorter than the numerical splitting tolerance")]
    DegenerateSegment { segment: RoadSegmentId },
}

impl RoadGraph {
    pub fn graph(&self) -> &UnGraph<RoadNode, RoadEdge> {
        &self.graph
    }

    pub fn node_index_of(&self, id: RoadNodeId) -> Option<NodeIndex> {
        self.id2idx.get(&id).copied()
    }

    pub fn building_index(&self, building: BuildingId) -> Option<NodeIndex> {
        self.building2idx.get(&building).copied()
    }

    pub fn degree_of_building(&self, building: BuildingId) -> usize {
        self.building_index(building)
            .map(|idx| self.graph.edges(idx).count())
            .unwrap_or(0)
    }

    /// Adds a direct Euclidean edge between every pair of building nodes, alongside
    /// whatever road-following edges already connect them (`InstallationStrategy::Adjacent`,
    /// spec.md §6).
    pub fn add_building_adjacency_edges(&mut self) {
        let buildings: Vec<BuildingId> = self.building2idx.keys().copied().collect();
        for i in 0..buildings.len() {
            for j in (i + 1)..buildings.len() {
                let a_idx = self.building2idx[&buildings[i]];
                let b_idx = self.building2idx[&buildings[j]];
                let weight = self.graph[a_idx].location.distance(self.graph[b_idx].location);
                self.graph.add_edge(
                    a_idx,
                    b_idx,
                    RoadEdge {
                        weight,
                        segment_ids: Vec::new(),
                        road_type: None,
                    },
                );
            }
        }
    }
}

/// Builds the street-following road graph from road segments and building centroids
/// (spec.md §4.1).
pub struct RoadGraphBuilder {
    next_node_id: usize,
}

impl RoadGraphBuilder {
    pub fn new() -> Self {
        Self { next_node_id: 0 }
    }

    fn fresh_node_id(&mut self) -> RoadNodeId {
        let id = RoadNodeId::new(self.next_node_id);
        self.next_node_id += 1;
        id
    }

    pub fn build(
        mut self,
        segments: &[RoadSegment],
        buildings: &[Building],
    ) -> Result<RoadGraph, GraphError> {
        if segments.is_empty() {
            return Err(GraphError::NoRoads);
        }
        if buildings.is_empty() {
            return Err(GraphError::NoBuildings);
        }

        // Step 1: for each building, find the nearest segment and the nearest point on it.
        let mut access_points_by_segment: FxHashMap<usize, Vec<(Point2, f64, BuildingId)>> =
            FxHashMap::default();
        for building in buildings {
            let mut best: Option<(usize, Point2, f64, f64)> = None; // (seg idx, point, t, dist)
            for (seg_idx, seg) in segments.iter().enumerate() {
                let (proj, t) = project_onto_segment(building.location, seg.a, seg.b);
                let dist = building.location.distance_f64(proj);
                if best.map(|(_, _, _, best_dist)| dist < best_dist).unwrap_or(true) {
                    best = Some((seg_idx, proj, t, dist));
                }
            }
            let (seg_idx, proj, t, _) = best.ok_or(GraphError::NoNearbyRoad { building: building.id })?;
            access_points_by_segment
                .entry(seg_idx)
                .or_default()
                .push((proj, t, building.id));
        }

        let mut graph = UnGraph::new_undirected();
        let mut coord2idx: FxHashMap<CoordKey, NodeIndex> = FxHashMap::default();
        let mut id2idx: FxHashMap<RoadNodeId, NodeIndex> = FxHashMap::default();
        let mut building2idx: FxHashMap<BuildingId, NodeIndex> = FxHashMap::default();

        fn get_or_insert_coord(
            graph: &mut UnGraph<RoadNode, RoadEdge>,
            coord2idx: &mut FxHashMap<CoordKey, NodeIndex>,
            id2idx: &mut FxHashMap<RoadNodeId, NodeIndex>,
            next_node_id: &mut usize,
            location: Point2,
        ) -> NodeIndex {
            let key = CoordKey::from(location);
            if let Some(&idx) = coord2idx.get(&key) {
                return idx;
            }
            let id = RoadNodeId::new(*next_node_id);
            *next_node_id += 1;
            let node = RoadNode {
                id,
                location,
                kind: RoadNodeKind::Internal,
            };
            let idx = graph.add_node(node);
            coord2idx.insert(key, idx);
            id2idx.insert(id, idx);
            idx
        }

        let mut next_segment_id = segments
            .iter()
            .map(|s| s.id.inner())
            .max()
            .map(|m| m + 1)
            .unwrap_or(0);

        // Step 2 & 3: split each road segment at its access points, emitting sub-edges.
        for (seg_idx, seg) in segments.iter().enumerate() {
            let seg_len = seg.length().into_f64();
            let aps = access_points_by_segment.get(&seg_idx);
            let too_short = seg_len < POINT_SPACING_TOLERANCE;
            if aps.is_none() || too_short {
                let a_idx = get_or_insert_coord(
                    &mut graph,
                    &mut coord2idx,
                    &mut id2idx,
                    &mut self.next_node_id,
                    seg.a,
                );
                let b_idx = get_or_insert_coord(
                    &mut graph,
                    &mut coord2idx,
                    &mut id2idx,
                    &mut self.next_node_id,
                    seg.b,
                );
                graph.add_edge(
                    a_idx,
                    b_idx,
                    RoadEdge {
                        weight: seg.length(),
                        segment_ids: vec![seg.id],
                        road_type: Some(seg.road_type.clone()),
                    },
                );
                continue;
            }
            let mut aps = aps.unwrap().clone();
            // Order access points by distance from the segment's start (spec.md §4.1).
            aps.sort_by(|x, y| x.1.partial_cmp(&y.1).expect("NaN projection fraction"));

            // Build the ordered chain of points: start, access points (deduped against
            // endpoints), end.
            let mut chain: Vec<Point2> = Vec::with_capacity(aps.len() + 2);
            chain.push(seg.a);
            for (pt, _t, _bid) in &aps {
                if !pt.coincides_with(*chain.last().unwrap()) {
                    chain.push(*pt);
                }
            }
            if !seg.b.coincides_with(*chain.last().unwrap()) {
                chain.push(seg.b);
            }

            for w in chain.windows(2) {
                let a_idx = get_or_insert_coord(
                    &mut graph,
                    &mut coord2idx,
                    &mut id2idx,
                    &mut self.next_node_id,
                    w[0],
                );
                let b_idx = get_or_insert_coord(
                    &mut graph,
                    &mut coord2idx,
                    &mut id2idx,
                    &mut self.next_node_id,
                    w[1],
                );
                let sub_len = w[0].distance_f64(w[1]);
                let new_id = RoadSegmentId::new(next_segment_id);
                next_segment_id += 1;
                graph.add_edge(
                    a_idx,
                    b_idx,
                    RoadEdge {
                        weight: Meters::new(sub_len),
                        segment_ids: vec![new_id],
                        road_type: Some(seg.road_type.clone()),
                    },
                );
            }

            // Step: mark every access point vertex on this segment as an `AccessPoint`.
            for (pt, _t, bid) in &aps {
                let key = CoordKey::from(*pt);
                if let Some(&idx) = coord2idx.get(&key) {
                    let node = &mut graph[idx];
                    if matches!(node.kind, RoadNodeKind::Internal) {
                        node.kind = RoadNodeKind::AccessPoint { building: *bid };
                    }
                }
            }
        }

        // Step 4: for each access point, emit a zero-length edge to its building node.
        for building in buildings {
            let aps_for_building = access_points_by_segment
                .values()
                .flatten()
                .find(|(_, _, bid)| *bid == building.id);
            let (ap_point, _, _) = aps_for_building
                .copied()
                .ok_or(GraphError::NoNearbyRoad { building: building.id })?;
            let ap_idx = coord2idx[&CoordKey::from(ap_point)];

            let building_node_id = RoadNodeId::new(self.next_node_id);
            self.next_node_id += 1;
            let building_node = RoadNode {
                id: building_node_id,
                location: building.location,
                kind: RoadNodeKind::Building { building: building.id },
            };
            let building_idx = graph.add_node(building_node);
            id2idx.insert(building_node_id, building_idx);
            building2idx.insert(building.id, building_idx);

            graph.add_edge(
                ap_idx,
                building_idx,
                RoadEdge {
                    weight: Meters::ZERO,
                    segment_ids: Vec::new(),
                    road_type: None,
                },
            );
        }

        Ok(RoadGraph {
            graph,
            id2idx,
            building2idx,
        })
    }

    /// Builds the complete Euclidean graph over building centroids, ignoring road
    /// segments entirely (`InstallationStrategy::Greenfield`, spec.md §6).
    pub fn build_greenfield(mut self, buildings: &[Building]) -> Result<RoadGraph, GraphError> {
        if buildings.is_empty() {
            return Err(GraphError::NoBuildings);
        }

        let mut graph = UnGraph::new_undirected();
        let mut id2idx = FxHashMap::default();
        let mut building2idx = FxHashMap::default();

        for building in buildings {
            let id = self.fresh_node_id();
            let node = RoadNode {
                id,
                location: building.location,
                kind: RoadNodeKind::Building { building: building.id },
            };
            let idx = graph.add_node(node);
            id2idx.insert(id, idx);
            building2idx.insert(building.id, idx);
        }

        for i in 0..buildings.len() {
            for j in (i + 1)..buildings.len() {
                let a_idx = building2idx[&buildings[i].id];
                let b_idx = building2idx[&buildings[j].id];
                let weight = buildings[i].location.distance(buildings[j].location);
                graph.add_edge(
                    a_idx,
                    b_idx,
                    RoadEdge {
                        weight,
                        segment_ids: Vec::new(),
                        road_type: None,
                    },
                );
            }
        }

        Ok(RoadGraph {
            graph,
            id2idx,
            building2idx,
        })
    }
}

impl Default for RoadGraphBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Dispatches graph construction on `strategy` (spec.md §9): every variant produces the
/// same `RoadGraph` contract, so callers never branch on installation strategy
/// themselves.
pub fn build_road_graph(
    segments: &[RoadSegment],
    buildings: &[Building],
    strategy: InstallationStrategy,
) -> Result<RoadGraph, GraphError> {
    match strategy {
        InstallationStrategy::StreetFollowing => RoadGraphBuilder::new().build(segments, buildings),
        InstallationStrategy::Greenfield => RoadGraphBuilder::new().build_greenfield(buildings),
        InstallationStrategy::Adjacent => {
            let mut graph = RoadGraphBuilder::new().build(segments, buildings)?;
            graph.add_building_adjacency_edges();
            Ok(graph)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::units::{KiloWattHours, KiloWatts};

    fn building(id: u64, x: f64, y: f64) -> Building {
        Building::new(
            BuildingId::new(id),
            Point2::new(x, y),
            KiloWatts::new(10.0),
            KiloWattHours::new(1000.0),
        )
    }

    #[test]
    fn every_building_has_degree_at_least_one() {
        let segments = vec![RoadSegment::new(
            RoadSegmentId::new(0),
            Point2::new(0.0, 0.0),
            Point2::new(100.0, 0.0),
            "residential",
        )];
        let buildings = vec![building(0, 50.0, 10.0), building(1, 20.0, -5.0)];
        let g = RoadGraphBuilder::new().build(&segments, &buildings).unwrap();
        for b in &buildings {
            assert!(g.degree_of_building(b.id) >= 1);
        }
    }

    #[test]
    fn split_sub_edge_lengths_sum_to_original() {
        let segments = vec![RoadSegment::new(
            RoadSegmentId::new(0),
            Point2::new(0.0, 0.0),
            Point2::new(100.0, 0.0),
            "residential",
        )];
        let original_len = segments[0].length().into_f64();
        let buildings = vec![building(0, 30.0, 10.0), building(1, 70.0, -10.0)];
        let g = RoadGraphBuilder::new().build(&segments, &buildings).unwrap();

        let total: f64 = g
            .graph
            .edge_weights()
            .filter(|e| !e.segment_ids.is_empty())
            .map(|e| e.weight.into_f64())
            .sum();
        assert!((total - original_len).abs() < 1e-6);
    }

    #[test]
    fn split_graph_shape_matches_snapshot() {
        let segments = vec![RoadSegment::new(
            RoadSegmentId::new(0),
            Point2::new(0.0, 0.0),
            Point2::new(100.0, 0.0),
            "residential",
        )];
        let buildings = vec![building(0, 30.0, 10.0), building(1, 70.0, -10.0)];
        let g = RoadGraphBuilder::new().build(&segments, &buildings).unwrap();
        insta::assert_yaml_snapshot!(g.graph);
    }

    #[test]
    fn empty_inputs_are_fatal() {
        let buildings = vec![building(0, 0.0, 0.0)];
        assert!(matches!(
            RoadGraphBuilder::new().build(&[], &buildings),
            Err(GraphError::NoRoads)
        ));
        let segments = vec![RoadSegment::new(
            RoadSegmentId::new(0),
            Point2::new(0.0, 0.0),
            Point2::new(1.0, 0.0),
            "residential",
        )];
        assert!(matches!(
            RoadGraphBuilder::new().build(&segments, &[]),
            Err(GraphError::NoBuildings)
        ));
    }

    #[test]
    fn access_point_coinciding_with_endpoint_creates_no_split() {
        let segments = vec![RoadSegment::new(
            RoadSegmentId::new(0),
            Point2::new(0.0, 0.0),
            Point2::new(100.0, 0.0),
            "residential",
        )];
        // Building projects exactly onto the segment's start endpoint.
        let buildings = vec![building(0, 0.0, 0.0)];
        let g = RoadGraphBuilder::new().build(&segments, &buildings).unwrap();
        let edge_count = g
            .graph
            .edge_weights()
            .filter(|e| !e.segment_ids.is_empty())
            .count();
        assert_eq!(edge_count, 1);
    }

    #[test]
    fn greenfield_ignores_roads_and_connects_every_pair() {
        let buildings = vec![building(0, 0.0, 0.0), building(1, 10.0, 0.0), building(2, 0.0, 10.0)];
        let g = build_road_graph(&[], &buildings, InstallationStrategy::Greenfield).unwrap();
        assert_eq!(g.graph.edge_count(), 3);
        for b in &buildings {
            assert_eq!(g.degree_of_building(b.id), 2);
        }
    }

    #[test]
    fn adjacent_keeps_road_edges_and_adds_direct_ones() {
        let segments = vec![RoadSegment::new(
            RoadSegmentId::new(0),
            Point2::new(0.0, 0.0),
            Point2::new(100.0, 0.0),
            "residential",
        )];
        let buildings = vec![building(0, 30.0, 10.0), building(1, 70.0, -10.0)];
        let street_only = RoadGraphBuilder::new().build(&segments, &buildings).unwrap();
        let adjacent = build_road_graph(&segments, &buildings, InstallationStrategy::Adjacent).unwrap();
        assert_eq!(adjacent.graph.edge_count(), street_only.graph.edge_count() + 1);
        let direct_edge = adjacent
            .graph
            .edge_weights()
            .find(|e| e.segment_ids.is_empty() && e.weight.into_f64() > 0.0)
            .expect("direct building-to-building edge present");
        assert!(direct_edge.road_type.is_none());
    }
}
