//! The clustering result type shared by the clustering crate and the BRKGA decoder
//! (spec.md §3, §4.5, §4.6): which building belongs to which cluster, and which cluster a
//! building was assigned as the connection center.

use rustc_hash::FxHashMap;

use crate::ident::BuildingId;

/// Sentinel bucket for buildings DBSCAN marks as noise before the genetic stage absorbs
/// them into a real cluster (spec.md §4.3).
pub const NON_MEMBER: usize = usize::MAX;

/// A full partition of buildings into clusters, plus the chosen center of each cluster.
#[derive(Debug, Clone, Default, derive_new::new)]
pub struct ClusterAssignment {
    /// Maps each building to its cluster index (`NON_MEMBER` for unassigned buildings).
    pub cluster_of: FxHashMap<BuildingId, usize>,
    /// The center building of each cluster, indexed by cluster index.
    pub centers: Vec<BuildingId>,
}

impl ClusterAssignment {
    pub fn num_clusters(&self) -> usize {
        self.centers.len()
    }

    pub fn members_of(&self, cluster: usize) -> Vec<BuildingId> {
        self.cluster_of
            .iter()
            .filter(|(_, &c)| c == cluster)
            .map(|(&b, _)| b)
            .collect()
    }

    pub fn center_of(&self, cluster: usize) -> Option<BuildingId> {
        self.centers.get(cluster).copied()
    }

    pub fn cluster_of(&self, building: BuildingId) -> Option<usize> {
        self.cluster_of.get(&building).copied()
    }

    /// `true` if every building is assigned to a real cluster (no `NON_MEMBER` entries).
    pub fn is_complete(&self) -> bool {
        self.cluster_of.values().all(|&c| c != NON_MEMBER)
    }
}
