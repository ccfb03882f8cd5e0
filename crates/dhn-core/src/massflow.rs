//! Simultaneity factor and mass-flow propagation (spec.md §4.7 step 4).
//!
//! `s(k)` is an empirical logistic-style correction for the fact that `k` buildings
//! rarely hit peak demand simultaneously; mass flow is propagated post-order over the
//! cluster's pipe tree.

use rustc_hash::FxHashMap;

use crate::ident::BuildingId;
use crate::tree::ClusterTree;
use crate::units::{KgPerSec, KiloWatts};

/// Simultaneity-factor constants, fit empirically (spec.md §4.7); not derived here.
pub const SIMULTANEITY_A: f64 = 0.449677646267461;
pub const SIMULTANEITY_B: f64 = 0.551234688;
pub const SIMULTANEITY_C: f64 = 53.84382392;
pub const SIMULTANEITY_D: f64 = 1.762743268;

/// Supply/return temperature delta, kelvin.
pub const DELTA_T: f64 = 30.0;
/// Specific heat capacity of water, kJ/(kg·K).
pub const SPECIFIC_HEAT_CAPACITY: f64 = 4.190;
/// Density of water, kg/L.
pub const WATER_DENSITY: f64 = 0.997;

/// `s(k) = a + b / (1 + (k/c)^d)`: strictly decreasing in `k`, range `(a, a+b]` for `k>=1`.
pub fn simultaneity_factor(k: usize) -> f64 {
    SIMULTANEITY_A + SIMULTANEITY_B / (1.0 + (k as f64 / SIMULTANEITY_C).powf(SIMULTANEITY_D))
}

/// Per-edge mass flow, keyed by the edge's downstream (child) building.
#[derive(Debug, Clone)]
pub struct MassFlowResult {
    pub flow_at: FxHashMap<BuildingId, KgPerSec>,
    /// `n(v)`: size of the subtree rooted at `v`, including `v`.
    pub subtree_size: FxHashMap<BuildingId, usize>,
    /// `D(v)`: total demand of the subtree rooted at `v`, including `v`.
    pub subtree_demand: FxHashMap<BuildingId, KiloWatts>,
}

/// Propagates mass flow post-order over `tree`, given each member's peak demand.
pub fn propagate_mass_flow(
    tree: &ClusterTree,
    demand_of: &FxHashMap<BuildingId, KiloWatts>,
) -> MassFlowResult {
    let mut subtree_size: FxHashMap<BuildingId, usize> = FxHashMap::default();
    let mut subtree_demand: FxHashMap<BuildingId, KiloWatts> = FxHashMap::default();
    let mut flow_at: FxHashMap<BuildingId, KgPerSec> = FxHashMap::default();

    // Leaves (and every node) start with their own demand; accumulate children upward.
    for idx in tree.graph.node_indices() {
        let building = tree.graph[idx];
        subtree_size.insert(building, 1);
        subtree_demand.insert(building, *demand_of.get(&building).unwrap_or(&KiloWatts::ZERO));
    }

    for (parent_idx, child_idx, _edge) in tree.post_order_edges() {
        let parent = tree.graph[parent_idx];
        let child = tree.graph[child_idx];
        let child_size = subtree_size[&child];
        let child_demand = subtree_demand[&child];

        *subtree_size.get_mut(&parent).unwrap() += child_size;
        *subtree_demand.get_mut(&parent).unwrap() =
            subtree_demand[&parent] + child_demand;

        let s = simultaneity_factor(child_size);
        let mass_flow = (child_demand.into_f64() * s)
            / (SPECIFIC_HEAT_CAPACITY * WATER_DENSITY * DELTA_T);
        flow_at.insert(child, KgPerSec::new(mass_flow));
    }

    MassFlowResult {
        flow_at,
        subtree_size,
        subtree_demand,
    }
}
