//! Warm-start chromosome construction (spec.md §4.6 step 1): encodes a precomputed
//! feasible assignment as a chromosome whose decode reproduces it, by concatenating
//! `[centers, members, excluded]` and assigning sorted random keys in that order.

use rand::Rng;
use rand_chacha::ChaCha8Rng;
use rustc_hash::FxHashMap;

use dhn_core::cluster::NON_MEMBER;
use dhn_core::{BuildingId, ClusterAssignment};

use crate::chromosome::Chromosome;
use crate::decoder::num_pivot_tokens;
use dhn_core::config::Config;

/// Builds the warm-start token order `[centers, members-per-cluster, excluded]` and
/// assigns each slot an ascending sorted random key, so decoding this chromosome with the
/// ordinary sort-by-key decoder reconstructs `assignment`'s center/member partition.
pub fn encode_warm_start(
    assignment: &ClusterAssignment,
    universe: &[BuildingId],
    config: &Config,
    rng: &mut ChaCha8Rng,
) -> Chromosome {
    let num_clusters = assignment.num_clusters();
    let mut order: Vec<BuildingId> = Vec::with_capacity(universe.len());

    for cluster in 0..num_clusters {
        let center = assignment.center_of(cluster).expect("cluster index in range");
        order.push(center);
        for member in assignment.members_of(cluster) {
            if member != center {
                order.push(member);
            }
        }
    }
    for &b in universe {
        if assignment.cluster_of(b) == Some(NON_MEMBER) || assignment.cluster_of(b).is_none() {
            order.push(b);
        }
    }

    let num_pivots = num_pivot_tokens(config, num_clusters);
    let total_len = order.len() + num_pivots;
    let mut sorted_keys: Vec<f64> = (0..total_len).map(|_| rng.gen_range(0.0..1.0)).collect();
    sorted_keys.sort_by(|a, b| a.partial_cmp(b).expect("non-NaN random key"));

    // Token sequence is `[universe..., pivots...]` (decoder::token_sequence); place each
    // ordered building's key at its fixed position in `universe`, and give the pivot
    // tokens keys at the end of `order` so they only take effect once every building has
    // been placed relative to the desired rank (matching the `Single`-strategy decoder's
    // "pivot marks assignment should stop here" semantics for the excluded tail).
    let mut keys = vec![0.0; universe.len() + num_pivots];
    let position_in_universe: FxHashMap<BuildingId, usize> = universe
        .iter()
        .enumerate()
        .map(|(i, &b)| (b, i))
        .collect();
    for (rank, &b) in order.iter().enumerate() {
        let idx = position_in_universe[&b];
        keys[idx] = sorted_keys[rank];
    }
    for (i, key) in sorted_keys.iter().skip(order.len()).enumerate() {
        keys[universe.len() + i] = *key;
    }

    Chromosome { keys }
}
