//! The external output contract (spec.md §6): a `clusters` list plus a `sums` summary,
//! serialized for the visualization collaborator via `serde_json`.

use serde::Serialize;

use dhn_core::cluster::NON_MEMBER;
use dhn_core::fitness::FitnessReport;
use dhn_core::prices::PriceTable;
use dhn_core::ClusterAssignment;

#[derive(Debug, Clone, Serialize)]
pub struct PipeTypeOutput {
    pub class: String,
    pub outer_diameter: f64,
    pub unit_price: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct PipeResultOutput {
    pub segment_ids: Vec<u64>,
    pub length: f64,
    pub pipe_type: PipeTypeOutput,
    pub from_building: u64,
    pub to_building: u64,
    pub mass_flow: f64,
    pub pipe_cost: f64,
    pub trench_cost: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClusterOutput {
    /// The cluster center's building id, or `-1` for the `NON_MEMBER` bucket.
    pub cluster_center: i64,
    pub members: Vec<u64>,
    pub pipe_result: Vec<PipeResultOutput>,
    pub supplied_power: f64,
    pub pipe_investment_cost: f64,
    pub trench_cost: f64,
    pub total_pipe_cost: f64,
    pub total_cost: f64,
    pub fitness: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SumsOutput {
    pub total_supplied_power: f64,
    pub total_pipe_investment_cost: f64,
    pub total_trench_cost: f64,
    pub total_cost: f64,
    pub total_fitness: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct DesignOutput {
    pub clusters: Vec<ClusterOutput>,
    pub sums: SumsOutput,
}

/// Builds the external output contract from a priced [`FitnessReport`] and the
/// assignment it was computed from (needed for the `NON_MEMBER` bucket, which carries no
/// fitness of its own).
pub fn build_output(
    report: &FitnessReport,
    assignment: &ClusterAssignment,
    prices: &PriceTable,
) -> DesignOutput {
    let mut clusters = Vec::with_capacity(report.clusters.len() + 1);
    let mut sums = SumsOutput {
        total_supplied_power: 0.0,
        total_pipe_investment_cost: 0.0,
        total_trench_cost: 0.0,
        total_cost: 0.0,
        total_fitness: 0.0,
    };

    for cluster in &report.clusters {
        let pipe_result: Vec<PipeResultOutput> = cluster
            .pipes
            .iter()
            .map(|pipe| {
                let price = prices.get(&pipe.diameter_class).ok();
                PipeResultOutput {
                    segment_ids: pipe.segment_ids.iter().map(|id| id.inner()).collect(),
                    length: pipe.length,
                    pipe_type: PipeTypeOutput {
                        class: pipe.diameter_class.clone(),
                        outer_diameter: price.map(|p| p.outer_diameter).unwrap_or_default(),
                        unit_price: price.map(|p| p.price).unwrap_or_default(),
                    },
                    from_building: pipe.from_building.inner(),
                    to_building: pipe.to_building.inner(),
                    mass_flow: pipe.mass_flow.into_f64(),
                    pipe_cost: pipe.pipe_cost.into_f64(),
                    trench_cost: pipe.trench_cost.into_f64(),
                }
            })
            .collect();

        sums.total_supplied_power += cluster.supplied_power.into_f64();
        sums.total_pipe_investment_cost += cluster.pipe_investment_cost.into_f64();
        sums.total_trench_cost += cluster.trench_cost.into_f64();
        sums.total_cost += cluster.total_cost.into_f64();
        sums.total_fitness += cluster.fitness;

        clusters.push(ClusterOutput {
            cluster_center: cluster.center.inner() as i64,
            members: cluster.members.iter().map(|b| b.inner()).collect(),
            pipe_result,
            supplied_power: cluster.supplied_power.into_f64(),
            pipe_investment_cost: cluster.pipe_investment_cost.into_f64(),
            trench_cost: cluster.trench_cost.into_f64(),
            total_pipe_cost: (cluster.pipe_investment_cost + cluster.trench_cost).into_f64(),
            total_cost: cluster.total_cost.into_f64(),
            fitness: cluster.fitness,
        });
    }

    let excluded: Vec<u64> = assignment
        .cluster_of
        .iter()
        .filter(|(_, &c)| c == NON_MEMBER)
        .map(|(b, _)| b.inner())
        .collect();
    if !excluded.is_empty() {
        clusters.push(ClusterOutput {
            cluster_center: -1,
            members: excluded,
            pipe_result: Vec::new(),
            supplied_power: 0.0,
            pipe_investment_cost: 0.0,
            trench_cost: 0.0,
            total_pipe_cost: 0.0,
            total_cost: 0.0,
            fitness: 0.0,
        });
    }

    DesignOutput { clusters, sums }
}
