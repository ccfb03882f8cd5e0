//! Feasibility repair (spec.md §4.5): moves buildings between bootstrap partitions, and
//! failing that to `NON_MEMBER`, until every partition respects the heat-source capacity.

use rustc_hash::FxHashMap;

use dhn_core::geometry::Point2;
use dhn_core::units::KiloWatts;
use dhn_core::{BuildingId, ClusterAssignment};

fn centroid(members: &[BuildingId], location_of: &FxHashMap<BuildingId, Point2>) -> Point2 {
    let n = members.len() as f64;
    let x = members.iter().map(|b| location_of[b].x).sum::<f64>() / n;
    let y = members.iter().map(|b| location_of[b].y).sum::<f64>() / n;
    Point2::new(x, y)
}

fn total_demand(members: &[BuildingId], demand_of: &FxHashMap<BuildingId, KiloWatts>) -> f64 {
    members
        .iter()
        .map(|b| demand_of.get(b).copied().unwrap_or(KiloWatts::ZERO).into_f64())
        .sum()
}

/// Repairs a set of bootstrap partitions into a capacity-feasible [`ClusterAssignment`],
/// following spec.md §4.5's four-step algorithm verbatim.
pub fn repair_feasibility(
    mut partitions: Vec<Vec<BuildingId>>,
    location_of: &FxHashMap<BuildingId, Point2>,
    demand_of: &FxHashMap<BuildingId, KiloWatts>,
    capacity: f64,
) -> ClusterAssignment {
    let mut excluded: Vec<BuildingId> = Vec::new();

    // Step 1 + 2: repeatedly relieve the most over-capacity partition by swapping its
    // farthest-from-center members into a partition with spare residual.
    loop {
        let residuals: Vec<f64> = partitions
            .iter()
            .map(|p| capacity - total_demand(p, demand_of))
            .collect();
        let Some((worst_idx, &worst_residual)) = residuals
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| a.partial_cmp(b).expect("non-NaN residual"))
            .filter(|(_, &r)| r < 0.0)
        else {
            break;
        };
        let _ = worst_residual;

        let center = centroid(&partitions[worst_idx], location_of);
        let mut order: Vec<usize> = (0..partitions[worst_idx].len()).collect();
        order.sort_by(|&a, &b| {
            let da = location_of[&partitions[worst_idx][a]].distance_f64(center);
            let db = location_of[&partitions[worst_idx][b]].distance_f64(center);
            db.partial_cmp(&da).expect("non-NaN distance")
        });

        let mut moved_one = false;
        for &i in &order {
            let candidate = partitions[worst_idx][i];
            let candidate_demand = demand_of
                .get(&candidate)
                .copied()
                .unwrap_or(KiloWatts::ZERO)
                .into_f64();

            // Step 2: find the nearest partition (by centroid distance) with residual
            // greater than the candidate's demand.
            let mut best: Option<(usize, f64)> = None;
            for (j, other) in partitions.iter().enumerate() {
                if j == worst_idx {
                    continue;
                }
                let other_residual = capacity - total_demand(other, demand_of);
                if other_residual <= candidate_demand {
                    continue;
                }
                let d = location_of[&candidate].distance_f64(centroid(other, location_of));
                if best.map(|(_, bd)| d < bd).unwrap_or(true) {
                    best = Some((j, d));
                }
            }

            if let Some((target_idx, _)) = best {
                partitions[worst_idx].retain(|&b| b != candidate);
                partitions[target_idx].push(candidate);
                moved_one = true;
                break;
            } else {
                // Step 3: no receiver; evict to NON_MEMBER.
                partitions[worst_idx].retain(|&b| b != candidate);
                excluded.push(candidate);
                moved_one = true;
                break;
            }
        }

        if !moved_one {
            break;
        }
    }

    partitions.retain(|p| !p.is_empty());

    // Step 4: the cluster center is the member nearest to the partition's geometric
    // center.
    let mut cluster_of: FxHashMap<BuildingId, usize> = FxHashMap::default();
    let mut centers = Vec::with_capacity(partitions.len());
    for (idx, members) in partitions.iter().enumerate() {
        let center_point = centroid(members, location_of);
        let chosen = *members
            .iter()
            .min_by(|a, b| {
                let da = location_of[a].distance_f64(center_point);
                let db = location_of[b].distance_f64(center_point);
                da.partial_cmp(&db).expect("non-NaN distance")
            })
            .expect("non-empty partition");
        centers.push(chosen);
        for &b in members {
            cluster_of.insert(b, idx);
        }
    }
    for b in excluded {
        cluster_of.insert(b, dhn_core::cluster::NON_MEMBER);
    }

    ClusterAssignment::new(cluster_of, centers)
}
