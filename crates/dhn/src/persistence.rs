//! Persisted state (spec.md §6): metric-graph serialization for warm restarts, and
//! per-generation / timing records written to a results folder as the BRKGA loop runs,
//! grounded on `parsimon-core`'s `serde`-based at-rest serialization.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use dhn_core::fitness::FitnessReport;
use dhn_core::graph::{MetricEdge, MetricGraph};
use dhn_core::BuildingId;

#[derive(Debug, Serialize, Deserialize)]
pub struct SerializedNode {
    pub building: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SerializedEdge {
    pub source: u64,
    pub target: u64,
    pub weight: f64,
    pub edge_ids: Vec<u64>,
    pub cost_factor: f64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SerializedMetricGraph {
    pub nodes: Vec<SerializedNode>,
    pub edges: Vec<SerializedEdge>,
}

#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("failed to (de)serialize: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to access {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

fn to_serialized(metric_graph: &MetricGraph) -> SerializedMetricGraph {
    let nodes = metric_graph
        .building_ids()
        .iter()
        .map(|&b| SerializedNode { building: b.inner() })
        .collect();

    let ids = metric_graph.building_ids();
    let mut edges = Vec::new();
    for (i, &a) in ids.iter().enumerate() {
        for &b in ids.iter().skip(i + 1) {
            if let Some(edge) = metric_graph.edge(a, b) {
                edges.push(SerializedEdge {
                    source: a.inner(),
                    target: b.inner(),
                    weight: edge.length,
                    edge_ids: edge.segment_ids.iter().map(|id| id.inner()).collect(),
                    cost_factor: edge.cost_factor,
                });
            }
        }
    }

    SerializedMetricGraph { nodes, edges }
}

/// Serializes the metric graph's nodes and edges for a warm restart (`Config::save_graph`).
pub fn serialize_metric_graph(metric_graph: &MetricGraph) -> Result<String, PersistenceError> {
    Ok(serde_json::to_string_pretty(&to_serialized(metric_graph))?)
}

/// Writes the serialized metric graph to `path` (`Config::graph_file_name`).
pub fn save_metric_graph(path: &Path, metric_graph: &MetricGraph) -> Result<(), PersistenceError> {
    let json = serialize_metric_graph(metric_graph)?;
    fs::write(path, json).map_err(|source| PersistenceError::Io {
        path: path.display().to_string(),
        source,
    })
}

/// Reconstructs a metric graph from a previously saved file (`Config::load_graph`).
pub fn load_metric_graph(path: &Path) -> Result<MetricGraph, PersistenceError> {
    let text = fs::read_to_string(path).map_err(|source| PersistenceError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let serialized: SerializedMetricGraph = serde_json::from_str(&text)?;
    let building_ids: Vec<BuildingId> = serialized
        .nodes
        .iter()
        .map(|n| BuildingId::new(n.building))
        .collect();
    let edges = serialized.edges.into_iter().map(|e| {
        (
            BuildingId::new(e.source),
            BuildingId::new(e.target),
            MetricEdge {
                length: e.weight,
                segment_ids: e.edge_ids.into_iter().map(Into::into).collect(),
                cost_factor: e.cost_factor,
            },
        )
    });
    Ok(MetricGraph::from_parts(building_ids, edges))
}

/// One cluster's contribution to a per-generation summary.
#[derive(Debug, Serialize)]
pub struct ClusterSummary {
    pub center: u64,
    pub total_cost: f64,
    pub supplied_power: f64,
}

/// The decoded assignment's summary carried by a [`GenerationRecord`] (spec.md §6).
#[derive(Debug, Serialize)]
pub struct AssignmentSummary {
    pub total_cost: f64,
    pub supplied_power: f64,
    pub per_cluster: Vec<ClusterSummary>,
}

impl From<&FitnessReport> for AssignmentSummary {
    fn from(report: &FitnessReport) -> Self {
        let per_cluster: Vec<ClusterSummary> = report
            .clusters
            .iter()
            .map(|c| ClusterSummary {
                center: c.center.inner(),
                total_cost: c.total_cost.into_f64(),
                supplied_power: c.supplied_power.into_f64(),
            })
            .collect();
        Self {
            total_cost: per_cluster.iter().map(|c| c.total_cost).sum(),
            supplied_power: per_cluster.iter().map(|c| c.supplied_power).sum(),
            per_cluster,
        }
    }
}

/// One `brkga_generation_{k}.json` record (spec.md §6): a snapshot of the run's progress
/// at a given generation. `summary` is `None` when the generation's best chromosome could
/// not be priced without folding to the penalty value (spec.md §7: penalty rejections are
/// not reported per chromosome).
#[derive(Debug, Serialize)]
pub struct GenerationRecord {
    pub timestamp: String,
    pub seed: u64,
    pub generation: u32,
    pub population_size: usize,
    pub best_fitness: f64,
    pub summary: Option<AssignmentSummary>,
}

/// One entry of `times_per_generation.json`: generation index to wall-clock timestamp.
#[derive(Debug, Serialize)]
pub struct GenerationTiming {
    pub generation: u32,
    pub timestamp: String,
}

pub fn generation_record_filename(generation: u32) -> String {
    format!("brkga_generation_{generation}.json")
}

pub const TIMES_PER_GENERATION_FILENAME: &str = "times_per_generation.json";

/// Writes one `brkga_generation_{k}.json` record into `results_dir`.
pub fn write_generation_record(results_dir: &Path, record: &GenerationRecord) -> Result<(), PersistenceError> {
    let path = results_dir.join(generation_record_filename(record.generation));
    let json = serde_json::to_string_pretty(record)?;
    fs::write(&path, json).map_err(|source| PersistenceError::Io {
        path: path.display().to_string(),
        source,
    })
}

/// Writes the full `times_per_generation.json` timing log into `results_dir`.
pub fn write_timings(results_dir: &Path, timings: &[GenerationTiming]) -> Result<(), PersistenceError> {
    let path = results_dir.join(TIMES_PER_GENERATION_FILENAME);
    let json = serde_json::to_string_pretty(timings)?;
    fs::write(&path, json).map_err(|source| PersistenceError::Io {
        path: path.display().to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use dhn_core::building::Building;
    use dhn_core::config::Config;
    use dhn_core::geometry::Point2;
    use dhn_core::graph::{build_metric_graph, RoadGraphBuilder};
    use dhn_core::road::RoadSegment;
    use dhn_core::units::{Currency, KiloWattHours, KiloWatts};
    use dhn_core::{BuildingId, RoadSegmentId};

    fn triangle_metric_graph() -> MetricGraph {
        let mk = |id, x, y| {
            Building::new(
                BuildingId::new(id),
                Point2::new(x, y),
                KiloWatts::new(10.0),
                KiloWattHours::new(0.0),
            )
        };
        let buildings = vec![mk(0, 0.0, 0.0), mk(1, 100.0, 0.0), mk(2, 50.0, 86.60254)];
        let segs = vec![
            RoadSegment::new(RoadSegmentId::new(0), buildings[0].location, buildings[1].location, "residential"),
            RoadSegment::new(RoadSegmentId::new(1), buildings[1].location, buildings[2].location, "residential"),
            RoadSegment::new(RoadSegmentId::new(2), buildings[2].location, buildings[0].location, "residential"),
        ];
        let rg = RoadGraphBuilder::new().build(&segs, &buildings).unwrap();
        let config = Config::builder()
            .heat_capacity(KiloWatts::new(100.0))
            .fixed_cost(Currency::new(1000.0))
            .trench_cost_per_cubic_m(Currency::new(50.0))
            .eps(10.0)
            .build();
        build_metric_graph(&rg, &buildings, &config)
    }

    #[test]
    fn round_trips_through_serialize_and_from_parts() {
        let mg = triangle_metric_graph();
        let json = serialize_metric_graph(&mg).unwrap();
        let serialized: SerializedMetricGraph = serde_json::from_str(&json).unwrap();
        let building_ids: Vec<BuildingId> = serialized
            .nodes
            .iter()
            .map(|n| BuildingId::new(n.building))
            .collect();
        let edges = serialized.edges.into_iter().map(|e| {
            (
                BuildingId::new(e.source),
                BuildingId::new(e.target),
                MetricEdge {
                    length: e.weight,
                    segment_ids: e.edge_ids.into_iter().map(Into::into).collect(),
                    cost_factor: e.cost_factor,
                },
            )
        });
        let reloaded = MetricGraph::from_parts(building_ids, edges);

        for &a in mg.building_ids() {
            for &b in mg.building_ids() {
                assert_eq!(mg.distance(a, b), reloaded.distance(a, b));
            }
        }
    }

    #[test]
    fn save_then_load_round_trips_through_disk() {
        let mg = triangle_metric_graph();
        let dir = std::env::temp_dir().join(format!("dhn-persistence-test-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("metric_graph.json");

        save_metric_graph(&path, &mg).unwrap();
        let reloaded = load_metric_graph(&path).unwrap();

        assert_eq!(mg.building_ids(), reloaded.building_ids());
        let d01 = mg.distance(BuildingId::new(0), BuildingId::new(1)).unwrap();
        let reloaded_d01 = reloaded.distance(BuildingId::new(0), BuildingId::new(1)).unwrap();
        assert!((d01 - reloaded_d01).abs() < 1e-9);

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn generation_record_filename_is_indexed_by_generation() {
        assert_eq!(generation_record_filename(0), "brkga_generation_0.json");
        assert_eq!(generation_record_filename(7), "brkga_generation_7.json");
    }
}
