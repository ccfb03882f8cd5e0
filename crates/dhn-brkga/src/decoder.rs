//! The BRKGA decoder (spec.md §4.6): turns a chromosome's gene order into a cluster
//! assignment via greedy nearest-center capacitated placement, honoring the pivot-token
//! early-stop mechanism.

use rustc_hash::FxHashMap;

use dhn_core::config::{Config, PivotStrategy};
use dhn_core::graph::MetricGraph;
use dhn_core::units::KiloWatts;
use dhn_core::{BuildingId, ClusterAssignment};

use crate::chromosome::Chromosome;

/// A slot in the encoded token sequence: either a real building, or (in
/// `PivotStrategy::Single`) a synthetic "stop assigning" marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Token {
    Building(BuildingId),
    Pivot,
}

/// Number of synthetic pivot tokens appended to the token sequence for a run with `k`
/// cluster centers (spec.md §3, §4.6). `PivotStrategy::None` carries none; `Single` gets
/// one pivot slot per candidate cluster, giving the decoder one opportunity per cluster
/// to truncate assignment early. (`Double` is rejected at configuration time.)
pub fn num_pivot_tokens(config: &Config, num_clusters: usize) -> usize {
    match config.pivot_strategy {
        PivotStrategy::None => 0,
        PivotStrategy::Single => num_clusters,
        PivotStrategy::Double => unreachable!("Config::validate rejects PivotStrategy::Double"),
    }
}

/// The fixed, chromosome-length-defining token sequence: every building once, followed
/// by the configured number of pivot tokens.
fn token_sequence(universe: &[BuildingId], num_pivots: usize) -> Vec<Token> {
    let mut tokens: Vec<Token> = universe.iter().map(|&b| Token::Building(b)).collect();
    tokens.extend(std::iter::repeat(Token::Pivot).take(num_pivots));
    tokens
}

pub fn chromosome_length(universe: &[BuildingId], config: &Config, num_clusters: usize) -> usize {
    universe.len() + num_pivot_tokens(config, num_clusters)
}

/// Decodes a chromosome into a cluster assignment, or `None` if the decode violates a
/// hard constraint (a pivot token landed in the center prefix under `PivotStrategy::Single`)
/// — the caller folds that into `CONSTRAINT_BROKEN`.
pub fn decode(
    chromosome: &Chromosome,
    universe: &[BuildingId],
    metric_graph: &MetricGraph,
    demand_of: &FxHashMap<BuildingId, KiloWatts>,
    config: &Config,
    num_clusters: usize,
) -> Option<ClusterAssignment> {
    let num_pivots = num_pivot_tokens(config, num_clusters);
    let tokens = token_sequence(universe, num_pivots);
    debug_assert_eq!(tokens.len(), chromosome.len());

    // Step 1 + 2: pair gene with token index, sort ascending by gene, translate to
    // ordered tokens.
    let mut order: Vec<usize> = (0..chromosome.len()).collect();
    order.sort_by(|&a, &b| {
        chromosome.keys[a]
            .partial_cmp(&chromosome.keys[b])
            .expect("chromosome genes are never NaN")
    });
    let ordered_tokens: Vec<Token> = order.iter().map(|&i| tokens[i]).collect();

    // Step 3: first `num_clusters` tokens are the cluster centers.
    let mut centers = Vec::with_capacity(num_clusters);
    for &tok in ordered_tokens.iter().take(num_clusters) {
        match tok {
            Token::Building(b) => centers.push(b),
            Token::Pivot => return None, // pivot in the center prefix: constraint broken
        }
    }

    // Step 4: residual capacities seeded from center demand.
    let mut residual: FxHashMap<BuildingId, f64> = centers
        .iter()
        .map(|&c| {
            let demand = demand_of.get(&c).copied().unwrap_or(KiloWatts::ZERO).into_f64();
            (c, residual_for(config, demand))
        })
        .collect();

    let mut cluster_of: FxHashMap<BuildingId, usize> = FxHashMap::default();
    let center_index: FxHashMap<BuildingId, usize> =
        centers.iter().enumerate().map(|(i, &c)| (c, i)).collect();
    for (i, &c) in centers.iter().enumerate() {
        cluster_of.insert(c, i);
    }

    // Step 5: remaining tokens assign greedily to the closest center with residual, or
    // `NON_MEMBER`. A pivot token (single-pivot mode) stops further assignment.
    let mut stopped = false;
    for &tok in ordered_tokens.iter().skip(num_clusters) {
        if stopped {
            if let Token::Building(b) = tok {
                cluster_of.insert(b, dhn_core::cluster::NON_MEMBER);
            }
            continue;
        }
        match tok {
            Token::Pivot => stopped = true,
            Token::Building(b) => {
                if center_index.contains_key(&b) {
                    continue; // centers are already placed
                }
                let demand = demand_of.get(&b).copied().unwrap_or(KiloWatts::ZERO).into_f64();
                let best = centers
                    .iter()
                    .filter(|&&c| residual[&c] >= demand)
                    .min_by(|&&a, &&b2| {
                        let da = metric_graph.distance(b, a).unwrap_or(f64::INFINITY);
                        let db = metric_graph.distance(b, b2).unwrap_or(f64::INFINITY);
                        da.partial_cmp(&db).expect("non-NaN distance")
                    })
                    .copied();
                match best {
                    Some(center) => {
                        *residual.get_mut(&center).unwrap() -= demand;
                        cluster_of.insert(b, center_index[&center]);
                    }
                    None => {
                        cluster_of.insert(b, dhn_core::cluster::NON_MEMBER);
                    }
                }
            }
        }
    }

    Some(ClusterAssignment::new(cluster_of, centers))
}

fn residual_for(config: &Config, center_demand: f64) -> f64 {
    config.heat_capacity.into_f64() - center_demand
}
