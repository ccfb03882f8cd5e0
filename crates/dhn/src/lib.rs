//! The end-to-end district heating network design pipeline: road graph construction,
//! the two-stage clustering core, BRKGA refinement, and final pricing — behind one
//! `run()` entry point, the way the `parsimon` crate re-exports `clustering-impls` +
//! `parsimon-core` behind a single facade.

pub mod output;
pub mod persistence;

use std::path::Path;

use rand::SeedableRng;
use rustc_hash::FxHashMap;

use dhn_clustering::{bisecting_kmeans, repair_feasibility, target_cluster_count, ClusteringAlgo, Dbscan};
use dhn_core::catalogue::PipeCatalogue;
use dhn_core::config::Config;
use dhn_core::error::InputError;
use dhn_core::fitness::try_evaluate_fitness;
use dhn_core::geometry::Point2;
use dhn_core::graph::{build_metric_graph, build_road_graph};
use dhn_core::prices::PriceTable;
use dhn_core::units::KiloWatts;
use dhn_core::{Building, ClusterAssignment, DhnError, RoadSegment};

use output::{build_output, DesignOutput};
use persistence::{AssignmentSummary, GenerationRecord, GenerationTiming};

#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub assignment: ClusterAssignment,
    pub design: DesignOutput,
    pub generations_run: u32,
}

/// Runs the full pipeline: builds the road and metric graphs, bootstraps a feasible
/// cluster assignment, refines it with BRKGA, and prices the winner.
///
/// `results_dir`, when given, receives the per-generation `brkga_generation_{k}.json`
/// records and the `times_per_generation.json` timing log as the BRKGA loop runs
/// (spec.md §6). Passing `None` runs the pipeline with no filesystem side effects, which
/// is what every in-process caller that only wants the final [`RunOutcome`] should do.
/// The metric-graph save/load behavior is independent of this and is controlled entirely
/// by `Config::save_graph`/`load_graph`/`graph_file_name`.
pub fn run(
    buildings: &[Building],
    road_segments: &[RoadSegment],
    config: &Config,
    catalogue: &PipeCatalogue,
    prices: &PriceTable,
    results_dir: Option<&Path>,
) -> Result<RunOutcome, DhnError> {
    config.validate()?;
    if buildings.is_empty() {
        return Err(InputError::EmptySelection.into());
    }

    let road_graph = build_road_graph(road_segments, buildings, config.installation_strategy)?;

    let metric_graph = load_or_build_metric_graph(&road_graph, buildings, config);
    if config.save_graph {
        if let Some(name) = &config.graph_file_name {
            if let Err(err) = persistence::save_metric_graph(Path::new(name), &metric_graph) {
                log::warn!("failed to persist metric graph to {name}: {err}");
            }
        } else {
            log::warn!("save_graph is set but graph_file_name is empty; skipping persistence");
        }
    }

    let location_of: FxHashMap<_, _> = buildings.iter().map(|b| (b.id, b.location)).collect();
    let demand_of: FxHashMap<_, _> = buildings.iter().map(|b| (b.id, b.peak_demand)).collect();

    let assignment = bootstrap_assignment(buildings, &metric_graph, &location_of, &demand_of, config);

    let num_clusters = assignment.num_clusters();
    log::info!("bootstrap produced {num_clusters} feasible clusters before refinement");

    let universe: Vec<_> = buildings.iter().map(|b| b.id).collect();
    let mut timings = Vec::new();
    let outcome = dhn_brkga::run(
        &universe,
        &metric_graph,
        &demand_of,
        catalogue,
        prices,
        config,
        num_clusters,
        Some(&assignment),
        || false,
        |generation, best_fitness, population_size, best_assignment| {
            log::debug!("generation {generation}: best fitness {best_fitness}");
            let Some(dir) = results_dir else { return };
            let timestamp = chrono::Utc::now().to_rfc3339();
            let summary = try_evaluate_fitness(best_assignment, &metric_graph, &demand_of, catalogue, prices, config)
                .ok()
                .as_ref()
                .map(AssignmentSummary::from);
            let record = GenerationRecord {
                timestamp: timestamp.clone(),
                seed: config.seed,
                generation,
                population_size,
                best_fitness,
                summary,
            };
            if let Err(err) = persistence::write_generation_record(dir, &record) {
                log::warn!("failed to write generation {generation} record: {err}");
            }
            timings.push(GenerationTiming { generation, timestamp });
        },
    );

    if let Some(dir) = results_dir {
        if let Err(err) = persistence::write_timings(dir, &timings) {
            log::warn!("failed to write generation timing log: {err}");
        }
    }

    if outcome.cancelled {
        log::info!("BRKGA run cancelled at generation {}", outcome.generations_run);
    }

    let report = try_evaluate_fitness(
        &outcome.assignment,
        &metric_graph,
        &demand_of,
        catalogue,
        prices,
        config,
    )?;
    let design = build_output(&report, &outcome.assignment, prices);

    Ok(RunOutcome {
        assignment: outcome.assignment,
        design,
        generations_run: outcome.generations_run,
    })
}

/// Loads the metric graph from `Config::graph_file_name` when `load_graph` is set,
/// falling back to a fresh build (logging a warning) if the file is missing or corrupt.
fn load_or_build_metric_graph(
    road_graph: &dhn_core::graph::RoadGraph,
    buildings: &[Building],
    config: &Config,
) -> dhn_core::graph::MetricGraph {
    if config.load_graph {
        if let Some(name) = &config.graph_file_name {
            match persistence::load_metric_graph(Path::new(name)) {
                Ok(graph) => return graph,
                Err(err) => log::warn!("failed to load persisted metric graph from {name} ({err}); rebuilding"),
            }
        } else {
            log::warn!("load_graph is set but graph_file_name is empty; building fresh");
        }
    }
    build_metric_graph(road_graph, buildings, config)
}

/// Builds the §4.3–§4.5 bootstrap: DBSCAN coarse grouping (ungrouped buildings fall into
/// one residual group), per-group weighted bisecting k-means, then feasibility repair
/// across every resulting partition at once.
fn bootstrap_assignment(
    buildings: &[Building],
    metric_graph: &dhn_core::graph::MetricGraph,
    location_of: &FxHashMap<dhn_core::BuildingId, Point2>,
    demand_of: &FxHashMap<dhn_core::BuildingId, KiloWatts>,
    config: &Config,
) -> ClusterAssignment {
    let capacity = config.heat_capacity.into_f64();
    let min_samples = (capacity * config.minimum_heat_capacity_exhaustion).floor();

    let dbscan = Dbscan::new(config.eps, min_samples, config.distance_measuring_method);
    let result = dbscan.cluster(metric_graph, location_of, demand_of);

    let mut grouped: std::collections::HashSet<dhn_core::BuildingId> =
        std::collections::HashSet::new();
    for group in &result.groups {
        grouped.extend(group.iter().copied());
    }
    let mut groups = result.groups;
    let leftover: Vec<_> = buildings
        .iter()
        .map(|b| b.id)
        .filter(|b| !grouped.contains(b))
        .collect();
    if !leftover.is_empty() {
        groups.push(leftover);
    }

    let mut rng = if config.use_random_seed {
        rand_chacha::ChaCha8Rng::from_entropy()
    } else {
        rand_chacha::ChaCha8Rng::seed_from_u64(config.seed)
    };

    let mut partitions = Vec::new();
    for group in &groups {
        let total_demand: f64 = group
            .iter()
            .map(|b| demand_of.get(b).copied().unwrap_or(KiloWatts::ZERO).into_f64())
            .sum();
        let k = target_cluster_count(
            total_demand,
            capacity,
            config.decrease_max_clusters_to_find_pctg,
        );
        let split = bisecting_kmeans(group, location_of, demand_of, k, &mut rng);
        partitions.extend(split);
    }

    repair_feasibility(partitions, location_of, demand_of, capacity)
}
