//! The fitness function (spec.md §4.7): ties the MST, tree orientation, mass-flow
//! propagation, pipe sizing, and cost model together into one scalar per chromosome.
//!
//! Evaluation errors never propagate to the caller (spec.md §7): a cluster that cannot be
//! priced is logged at `debug` and folded into `CONSTRAINT_BROKEN` so the genetic engine
//! simply ranks that chromosome last.

use rustc_hash::FxHashMap;

use crate::catalogue::PipeCatalogue;
use crate::cluster::ClusterAssignment;
use crate::config::Config;
use crate::graph::MetricGraph;
use crate::ident::BuildingId;
use crate::massflow::propagate_mass_flow;
use crate::pipe::{size_pipe, Pipe, PipeSizingError};
use crate::prices::PriceTable;
use crate::tree::{build_cluster_tree, TreeError};
use crate::units::{Currency, KiloWatts};

/// Penalty fitness for an infeasible or unpriceable chromosome. A large finite value, not
/// infinity, so the ranking and crossover machinery keep doing ordinary float arithmetic
/// on it (spec.md §9).
pub const CONSTRAINT_BROKEN: f64 = 10_000_000.0;

#[derive(Debug, thiserror::Error)]
pub enum FitnessError {
    #[error("cluster centered at {center} has non-positive total demand")]
    NonPositiveDemand { center: BuildingId },

    #[error(transparent)]
    Tree(#[from] TreeError),

    #[error(transparent)]
    PipeSizing(#[from] PipeSizingError),
}

/// The priced result of a single cluster.
#[derive(Debug, Clone)]
pub struct ClusterFitness {
    pub center: BuildingId,
    pub members: Vec<BuildingId>,
    pub pipes: Vec<Pipe>,
    pub supplied_power: KiloWatts,
    pub pipe_investment_cost: Currency,
    pub trench_cost: Currency,
    pub total_cost: Currency,
    pub fitness: f64,
}

/// The full priced result of an assignment.
#[derive(Debug, Clone)]
pub struct FitnessReport {
    pub clusters: Vec<ClusterFitness>,
    pub total_fitness: f64,
}

/// Evaluates the aggregate fitness of `assignment` (spec.md §4.7), logging and
/// penalizing any cluster that cannot be priced rather than propagating an error.
pub fn evaluate_fitness(
    assignment: &ClusterAssignment,
    metric_graph: &MetricGraph,
    demand_of: &FxHashMap<BuildingId, KiloWatts>,
    catalogue: &PipeCatalogue,
    prices: &PriceTable,
    config: &Config,
) -> f64 {
    match try_evaluate_fitness(assignment, metric_graph, demand_of, catalogue, prices, config) {
        Ok(report) => report.total_fitness,
        Err(err) => {
            log::debug!("chromosome rejected during fitness evaluation: {err}");
            CONSTRAINT_BROKEN
        }
    }
}

/// As [`evaluate_fitness`], but returns the full per-cluster breakdown for reporting
/// instead of folding failures into the penalty value. Used by the facade's final-answer
/// output, where the caller already knows the winning chromosome is feasible.
pub fn try_evaluate_fitness(
    assignment: &ClusterAssignment,
    metric_graph: &MetricGraph,
    demand_of: &FxHashMap<BuildingId, KiloWatts>,
    catalogue: &PipeCatalogue,
    prices: &PriceTable,
    config: &Config,
) -> Result<FitnessReport, FitnessError> {
    let mut clusters = Vec::with_capacity(assignment.num_clusters());
    let mut total_fitness = 0.0;

    for cluster_idx in 0..assignment.num_clusters() {
        let members = assignment.members_of(cluster_idx);
        let center = assignment
            .center_of(cluster_idx)
            .expect("cluster index within range must have a center");
        let total_demand: f64 = members
            .iter()
            .map(|b| demand_of.get(b).copied().unwrap_or(KiloWatts::ZERO).into_f64())
            .sum();
        if total_demand <= 0.0 {
            return Err(FitnessError::NonPositiveDemand { center });
        }
        let supplied_power = KiloWatts::new(total_demand);

        let cluster_fitness = if members.len() <= 1 {
            ClusterFitness {
                center,
                members,
                pipes: Vec::new(),
                supplied_power,
                pipe_investment_cost: Currency::ZERO,
                trench_cost: Currency::ZERO,
                total_cost: config.fixed_cost,
                fitness: config.fixed_cost.into_f64() / total_demand,
            }
        } else {
            let tree = build_cluster_tree(metric_graph, &members, center)?;
            let mass_flow = propagate_mass_flow(&tree, demand_of);

            let mut pipes = Vec::with_capacity(tree.graph.edge_count());
            let mut pipe_investment_cost = Currency::ZERO;
            let mut trench_cost = Currency::ZERO;
            for (parent_idx, child_idx, edge) in tree.post_order_edges() {
                let from = tree.graph[parent_idx];
                let to = tree.graph[child_idx];
                let flow = mass_flow.flow_at[&to];
                let pipe = size_pipe(
                    from,
                    to,
                    edge.segment_ids.clone(),
                    edge.length,
                    flow,
                    catalogue,
                    prices,
                    config.trench_cost_per_cubic_m,
                )?;
                pipe_investment_cost = pipe_investment_cost + pipe.pipe_cost;
                trench_cost = trench_cost + pipe.trench_cost;
                pipes.push(pipe);
            }

            let total_cost = config.fixed_cost + pipe_investment_cost + trench_cost;
            ClusterFitness {
                center,
                members,
                pipes,
                supplied_power,
                pipe_investment_cost,
                trench_cost,
                total_cost,
                fitness: total_cost.into_f64() / total_demand,
            }
        };

        total_fitness += cluster_fitness.fitness;
        clusters.push(cluster_fitness);
    }

    Ok(FitnessReport {
        clusters,
        total_fitness,
    })
}
