//! The k-partition bootstrap (spec.md §4.4): deterministic weighted bisecting k-means
//! with k-means++ initialization, splitting the largest cluster at each bisection.
//!
//! `ChaCha8Rng` is used instead of `StdRng` because `StdRng`'s algorithm is not
//! guaranteed stable across `rand` releases, and spec.md §8 requires bit-for-bit
//! determinism across platforms and runs for a fixed seed.

use rand::Rng;
use rand_chacha::ChaCha8Rng;
use rustc_hash::FxHashMap;

use dhn_core::geometry::Point2;
use dhn_core::units::KiloWatts;
use dhn_core::BuildingId;

/// `K_raw = floor(total_demand / capacity)`; `K = max(1, floor(K_raw * (1 - shrink)))`.
pub fn target_cluster_count(total_demand: f64, capacity: f64, shrink_fraction: f64) -> usize {
    let k_raw = (total_demand / capacity).floor();
    let k = (k_raw * (1.0 - shrink_fraction)).floor();
    (k as usize).max(1)
}

/// Splits `group` into `k` partitions via bisecting k-means, each bisection a weighted
/// 2-means run seeded from `rng`.
pub fn bisecting_kmeans(
    group: &[BuildingId],
    location_of: &FxHashMap<BuildingId, Point2>,
    demand_of: &FxHashMap<BuildingId, KiloWatts>,
    k: usize,
    rng: &mut ChaCha8Rng,
) -> Vec<Vec<BuildingId>> {
    if group.is_empty() || k <= 1 {
        return vec![group.to_vec()];
    }

    let mut partitions: Vec<Vec<BuildingId>> = vec![group.to_vec()];

    while partitions.len() < k {
        let (largest_idx, _) = partitions
            .iter()
            .enumerate()
            .max_by_key(|(_, p)| p.len())
            .expect("partitions is non-empty");
        let to_split = partitions.swap_remove(largest_idx);
        if to_split.len() < 2 {
            // Cannot split further; put it back and stop early.
            partitions.push(to_split);
            break;
        }
        let (a, b) = two_means_split(&to_split, location_of, demand_of, rng);
        partitions.push(a);
        partitions.push(b);
    }

    partitions
}

/// One weighted 2-means split with k-means++ initialization, a handful of Lloyd
/// iterations, deterministic given `rng`'s state.
fn two_means_split(
    points: &[BuildingId],
    location_of: &FxHashMap<BuildingId, Point2>,
    demand_of: &FxHashMap<BuildingId, KiloWatts>,
    rng: &mut ChaCha8Rng,
) -> (Vec<BuildingId>, Vec<BuildingId>) {
    const MAX_ITERATIONS: usize = 25;

    let loc = |b: &BuildingId| location_of[b];
    let weight = |b: &BuildingId| demand_of.get(b).copied().unwrap_or(KiloWatts::ZERO).into_f64();

    // k-means++: pick the first center uniformly, the second with probability
    // proportional to squared distance from the first.
    let first_idx = rng.gen_range(0..points.len());
    let mut centers = vec![loc(&points[first_idx])];

    let dist_sq: Vec<f64> = points
        .iter()
        .map(|b| loc(b).distance_f64(centers[0]).powi(2))
        .collect();
    let total: f64 = dist_sq.iter().sum();
    let second_idx = if total <= 0.0 {
        (first_idx + 1) % points.len()
    } else {
        let target = rng.gen_range(0.0..total);
        let mut acc = 0.0;
        let mut chosen = 0;
        for (i, &d) in dist_sq.iter().enumerate() {
            acc += d;
            if acc >= target {
                chosen = i;
                break;
            }
        }
        chosen
    };
    centers.push(loc(&points[second_idx]));

    let mut assignment = vec![0usize; points.len()];
    for _ in 0..MAX_ITERATIONS {
        let mut changed = false;
        for (i, b) in points.iter().enumerate() {
            let p = loc(b);
            let d0 = p.distance_f64(centers[0]);
            let d1 = p.distance_f64(centers[1]);
            let label = if d0 <= d1 { 0 } else { 1 };
            if assignment[i] != label {
                changed = true;
                assignment[i] = label;
            }
        }
        if !changed {
            break;
        }
        for label in 0..2 {
            let members: Vec<&BuildingId> = points
                .iter()
                .enumerate()
                .filter(|(i, _)| assignment[*i] == label)
                .map(|(_, b)| b)
                .collect();
            if members.is_empty() {
                continue;
            }
            let total_weight: f64 = members.iter().map(|b| weight(b)).sum();
            if total_weight <= 0.0 {
                let n = members.len() as f64;
                let x = members.iter().map(|b| loc(b).x).sum::<f64>() / n;
                let y = members.iter().map(|b| loc(b).y).sum::<f64>() / n;
                centers[label] = Point2::new(x, y);
            } else {
                let x = members.iter().map(|b| loc(b).x * weight(b)).sum::<f64>() / total_weight;
                let y = members.iter().map(|b| loc(b).y * weight(b)).sum::<f64>() / total_weight;
                centers[label] = Point2::new(x, y);
            }
        }
    }

    let mut a = Vec::new();
    let mut b = Vec::new();
    for (i, &building) in points.iter().enumerate() {
        if assignment[i] == 0 {
            a.push(building);
        } else {
            b.push(building);
        }
    }
    if a.is_empty() || b.is_empty() {
        // Degenerate split (all points identical); fall back to an even index split so
        // the caller always gets two non-empty partitions.
        let mid = points.len() / 2;
        return (points[..mid].to_vec(), points[mid..].to_vec());
    }
    (a, b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn grid_group() -> (Vec<BuildingId>, FxHashMap<BuildingId, Point2>, FxHashMap<BuildingId, KiloWatts>) {
        let mut ids = Vec::new();
        let mut locs = FxHashMap::default();
        let mut demands = FxHashMap::default();
        let mut next = 0u64;
        for cx in [0.0, 1000.0] {
            for dx in [0.0, 1.0, 2.0] {
                let id = BuildingId::new(next);
                next += 1;
                ids.push(id);
                locs.insert(id, Point2::new(cx + dx, 0.0));
                demands.insert(id, KiloWatts::new(10.0));
            }
        }
        (ids, locs, demands)
    }

    #[test]
    fn target_cluster_count_applies_shrink() {
        assert_eq!(target_cluster_count(1000.0, 100.0, 0.1), 9);
        assert_eq!(target_cluster_count(50.0, 100.0, 0.1), 1);
    }

    #[test]
    fn bisecting_produces_requested_partition_count() {
        let (ids, locs, demands) = grid_group();
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let partitions = bisecting_kmeans(&ids, &locs, &demands, 2, &mut rng);
        assert_eq!(partitions.len(), 2);
        let total: usize = partitions.iter().map(|p| p.len()).sum();
        assert_eq!(total, ids.len());
    }

    #[test]
    fn same_seed_gives_same_partitioning() {
        let (ids, locs, demands) = grid_group();
        let mut rng1 = ChaCha8Rng::seed_from_u64(7);
        let mut rng2 = ChaCha8Rng::seed_from_u64(7);
        let p1 = bisecting_kmeans(&ids, &locs, &demands, 2, &mut rng1);
        let p2 = bisecting_kmeans(&ids, &locs, &demands, 2, &mut rng2);
        assert_eq!(p1, p2);
    }
}
