//! The first-stage clusterer (spec.md §4.3): DBSCAN over the cost-weighted adjacency
//! `w_ij * f_ij`, using demand as the density weight instead of a plain point count.
//!
//! Grounded on `clustering-impls::cluster::ClusteringAlgo`/`GreedyClustering`'s shape: a
//! struct holding its parameters, a `cluster` method, and a `rayon`-parallelized
//! neighborhood scan.

use rustc_hash::FxHashMap;

use dhn_core::config::DistanceMeasuringMethod;
use dhn_core::geometry::Point2;
use dhn_core::graph::MetricGraph;
use dhn_core::units::KiloWatts;
use dhn_core::BuildingId;
use rayon::prelude::*;

/// A clustering algorithm over the metric graph's cost-weighted adjacency, following the
/// teacher's `ClusteringAlgo` trait shape.
pub trait ClusteringAlgo {
    fn cluster(
        &self,
        metric: &MetricGraph,
        location_of: &FxHashMap<BuildingId, Point2>,
        demand_of: &FxHashMap<BuildingId, KiloWatts>,
    ) -> DbscanResult;
}

/// Computes the building-to-building distance the first-stage clusterer adjudicates
/// `eps` against, per `Config::distance_measuring_method` (spec.md §6): `Centroids` is
/// straight-line distance between building centroids, bypassing the road network
/// entirely; `NearestPoint` is the road-following shortest-path length; `Custom` weights
/// that length by the §4.2 street-type cost factor.
fn measured_distance(
    method: DistanceMeasuringMethod,
    metric: &MetricGraph,
    location_of: &FxHashMap<BuildingId, Point2>,
    a: BuildingId,
    b: BuildingId,
) -> Option<f64> {
    match method {
        DistanceMeasuringMethod::Centroids => {
            Some(location_of.get(&a)?.distance_f64(*location_of.get(&b)?))
        }
        DistanceMeasuringMethod::NearestPoint => metric.distance(a, b),
        DistanceMeasuringMethod::Custom => metric.cost_weighted_distance(a, b),
    }
}

/// The first-stage clustering output: each coarse group's member buildings. Noise
/// (`-1`) and singleton clusters are dropped before this result is built.
#[derive(Debug, Clone, Default)]
pub struct DbscanResult {
    pub groups: Vec<Vec<BuildingId>>,
}

/// Demand-weighted DBSCAN: `eps` in cost units (`w_ij * f_ij`, not raw meters),
/// `min_samples` a demand threshold (kW) a neighborhood's total demand must meet for its
/// center to be a core point.
#[derive(Debug, Clone, Copy)]
pub struct Dbscan {
    pub eps: f64,
    pub min_samples: f64,
    pub distance_measuring_method: DistanceMeasuringMethod,
}

impl Dbscan {
    pub fn new(eps: f64, min_samples: f64, distance_measuring_method: DistanceMeasuringMethod) -> Self {
        Self {
            eps,
            min_samples,
            distance_measuring_method,
        }
    }

    fn neighbors(
        &self,
        metric: &MetricGraph,
        location_of: &FxHashMap<BuildingId, Point2>,
        point: BuildingId,
    ) -> Vec<BuildingId> {
        metric
            .building_ids()
            .iter()
            .copied()
            .filter(|&other| {
                other == point
                    || measured_distance(self.distance_measuring_method, metric, location_of, point, other)
                        .map(|d| d <= self.eps)
                        .unwrap_or(false)
            })
            .collect()
    }
}

impl ClusteringAlgo for Dbscan {
    fn cluster(
        &self,
        metric: &MetricGraph,
        location_of: &FxHashMap<BuildingId, Point2>,
        demand_of: &FxHashMap<BuildingId, KiloWatts>,
    ) -> DbscanResult {
        let ids = metric.building_ids();

        // Fan out the O(n^2) neighborhood scan across buildings, following
        // `GreedyClustering::cluster`'s `par_iter` closeness scan.
        let neighbor_lists: FxHashMap<BuildingId, Vec<BuildingId>> = ids
            .par_iter()
            .map(|&b| (b, self.neighbors(metric, location_of, b)))
            .collect();

        let neighborhood_weight = |neighbors: &[BuildingId]| -> f64 {
            neighbors
                .iter()
                .map(|b| demand_of.get(b).copied().unwrap_or(KiloWatts::ZERO).into_f64())
                .sum()
        };

        let mut cluster_of: FxHashMap<BuildingId, Option<usize>> =
            ids.iter().map(|&b| (b, None)).collect();
        let mut visited: FxHashMap<BuildingId, bool> = ids.iter().map(|&b| (b, false)).collect();
        let mut next_cluster = 0usize;

        for &point in ids {
            if visited[&point] {
                continue;
            }
            visited.insert(point, true);
            let neighbors = &neighbor_lists[&point];
            if neighborhood_weight(neighbors) < self.min_samples {
                continue; // not a core point; stays unassigned (noise) unless later reached
            }

            let cluster_id = next_cluster;
            next_cluster += 1;
            cluster_of.insert(point, Some(cluster_id));

            let mut seeds = neighbors.clone();
            let mut i = 0;
            while i < seeds.len() {
                let q = seeds[i];
                i += 1;
                if !visited[&q] {
                    visited.insert(q, true);
                    let q_neighbors = &neighbor_lists[&q];
                    if neighborhood_weight(q_neighbors) >= self.min_samples {
                        seeds.extend(q_neighbors.iter().copied());
                    }
                }
                if cluster_of[&q].is_none() {
                    cluster_of.insert(q, Some(cluster_id));
                }
            }
        }

        let mut groups: Vec<Vec<BuildingId>> = vec![Vec::new(); next_cluster];
        for &b in ids {
            if let Some(c) = cluster_of[&b] {
                groups[c].push(b);
            }
        }
        // Singleton clusters are treated the same as noise (spec.md §4.3).
        groups.retain(|g| g.len() > 1);

        DbscanResult { groups }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dhn_core::config::Config;
    use dhn_core::geometry::Point2;
    use dhn_core::graph::{build_metric_graph, RoadGraphBuilder};
    use dhn_core::road::RoadSegment;
    use dhn_core::units::{Currency, KiloWattHours};
    use dhn_core::{Building, RoadSegmentId};

    fn two_tight_clusters() -> (Vec<RoadSegment>, Vec<Building>) {
        let mk = |id, x, y| {
            Building::new(
                BuildingId::new(id),
                Point2::new(x, y),
                KiloWatts::new(10.0),
                KiloWattHours::new(0.0),
            )
        };
        let buildings = vec![
            mk(0, 0.0, 0.0),
            mk(1, 1.0, 0.0),
            mk(2, 2.0, 0.0),
            mk(3, 1000.0, 0.0),
            mk(4, 1001.0, 0.0),
            mk(5, 1002.0, 0.0),
        ];
        let segs = vec![RoadSegment::new(
            RoadSegmentId::new(0),
            Point2::new(-10.0, 0.0),
            Point2::new(2000.0, 0.0),
            "residential",
        )];
        (segs, buildings)
    }

    #[test]
    fn separates_two_tight_groups() {
        let (segs, buildings) = two_tight_clusters();
        let rg = RoadGraphBuilder::new().build(&segs, &buildings).unwrap();
        let config = Config::builder()
            .heat_capacity(KiloWatts::new(1000.0))
            .fixed_cost(Currency::new(1000.0))
            .trench_cost_per_cubic_m(Currency::new(50.0))
            .eps(5.0)
            .build();
        let mg = build_metric_graph(&rg, &buildings, &config);
        let demand_of: FxHashMap<BuildingId, KiloWatts> =
            buildings.iter().map(|b| (b.id, b.peak_demand)).collect();
        let location_of: FxHashMap<BuildingId, Point2> =
            buildings.iter().map(|b| (b.id, b.location)).collect();

        let dbscan = Dbscan::new(5.0, 15.0, DistanceMeasuringMethod::Custom);
        let result = dbscan.cluster(&mg, &location_of, &demand_of);
        assert_eq!(result.groups.len(), 2);
        for group in &result.groups {
            assert_eq!(group.len(), 3);
        }
    }

    #[test]
    fn centroids_mode_uses_straight_line_distance_not_cost_weighted() {
        let (segs, buildings) = two_tight_clusters();
        let rg = RoadGraphBuilder::new().build(&segs, &buildings).unwrap();
        let mut multipliers = std::collections::HashMap::new();
        // A huge street-type multiplier would blow `Custom` mode's cost-weighted
        // distance past `eps`, but must not affect `Centroids` mode at all.
        multipliers.insert("residential".to_string(), 1000.0);
        let config = Config::builder()
            .heat_capacity(KiloWatts::new(1000.0))
            .fixed_cost(Currency::new(1000.0))
            .trench_cost_per_cubic_m(Currency::new(50.0))
            .eps(5.0)
            .street_type_multipliers(multipliers)
            .build();
        let mg = build_metric_graph(&rg, &buildings, &config);
        let demand_of: FxHashMap<BuildingId, KiloWatts> =
            buildings.iter().map(|b| (b.id, b.peak_demand)).collect();
        let location_of: FxHashMap<BuildingId, Point2> =
            buildings.iter().map(|b| (b.id, b.location)).collect();

        let dbscan = Dbscan::new(5.0, 15.0, DistanceMeasuringMethod::Centroids);
        let result = dbscan.cluster(&mg, &location_of, &demand_of);
        assert_eq!(result.groups.len(), 2);
    }
}
