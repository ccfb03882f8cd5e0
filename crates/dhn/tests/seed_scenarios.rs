//! End-to-end seed scenarios (spec.md §8): fixed, hand-built inputs whose expected
//! behavior is known by construction, exercised through the public `dhn::run` pipeline
//! and the lower-level `dhn-core`/`dhn-brkga` building blocks where that is more direct.

use rustc_hash::FxHashMap;

use dhn_core::catalogue::parse_catalogue;
use dhn_core::config::Config;
use dhn_core::geometry::Point2;
use dhn_core::prices::PriceTable;
use dhn_core::units::{Currency, KiloWattHours, KiloWatts};
use dhn_core::{Building, BuildingId, RoadSegment, RoadSegmentId};

const CATALOGUE: &str = "mass_flow DN25 DN32\nkg/s Pa/m Pa/m\n0,01 50,0 30,0\n1,0 100,0 60,0\n10,0 400,0 200,0\n";
const PRICES: &str = r#"{
    "DN25": {"type": "uno", "outer_diameter": 32.0, "price": 45.0},
    "DN32": {"type": "uno", "outer_diameter": 40.0, "price": 60.0}
}"#;

fn building(id: u64, x: f64, y: f64, demand_kw: f64) -> Building {
    Building::new(
        BuildingId::new(id),
        Point2::new(x, y),
        KiloWatts::new(demand_kw),
        KiloWattHours::new(0.0),
    )
}

fn default_config(capacity_kw: f64) -> Config {
    Config::builder()
        .heat_capacity(KiloWatts::new(capacity_kw))
        .fixed_cost(Currency::new(500.0))
        .trench_cost_per_cubic_m(Currency::new(20.0))
        .eps(1000.0)
        .minimum_heat_capacity_exhaustion(0.01)
        .num_generations_to_break(5)
        .population_factor(2.0)
        .seed(1)
        .build()
}

#[test]
fn triangle_equal_demand_ample_capacity_yields_one_cluster() {
    let buildings = vec![
        building(0, 0.0, 0.0, 10.0),
        building(1, 100.0, 0.0, 10.0),
        building(2, 50.0, 86.602540378, 10.0),
    ];
    let segments = vec![
        RoadSegment::new(RoadSegmentId::new(0), buildings[0].location, buildings[1].location, "residential"),
        RoadSegment::new(RoadSegmentId::new(1), buildings[1].location, buildings[2].location, "residential"),
        RoadSegment::new(RoadSegmentId::new(2), buildings[2].location, buildings[0].location, "residential"),
    ];
    let config = default_config(1000.0);
    let catalogue = parse_catalogue(CATALOGUE).unwrap();
    let prices = PriceTable::parse(PRICES).unwrap();

    let outcome = dhn::run(&buildings, &segments, &config, &catalogue, &prices, None).unwrap();
    let served: usize = outcome
        .design
        .clusters
        .iter()
        .filter(|c| c.cluster_center != -1)
        .map(|c| c.members.len())
        .sum();
    assert_eq!(served, 3);
}

#[test]
fn two_buildings_exceeding_combined_capacity_leave_one_excluded() {
    // Two isolated buildings, each feasible alone but not together: DBSCAN finds no core
    // point (singleton groups are always dropped as noise) and routes both into one
    // leftover group; feasibility repair then has nowhere else to put the overflow and
    // must evict one to the `NON_MEMBER` bucket rather than serve both from one center.
    let buildings = vec![
        building(0, 0.0, 0.0, 10.0),
        building(1, 100_000.0, 0.0, 10.0),
    ];
    let segments = vec![RoadSegment::new(
        RoadSegmentId::new(0),
        buildings[0].location,
        buildings[1].location,
        "residential",
    )];
    let config = default_config(15.0);
    let catalogue = parse_catalogue(CATALOGUE).unwrap();
    let prices = PriceTable::parse(PRICES).unwrap();

    let outcome = dhn::run(&buildings, &segments, &config, &catalogue, &prices, None).unwrap();
    let real_clusters: Vec<_> = outcome
        .design
        .clusters
        .iter()
        .filter(|c| c.cluster_center != -1)
        .collect();
    assert_eq!(real_clusters.len(), 1);
    assert_eq!(real_clusters[0].members.len(), 1);

    let excluded = outcome.design.clusters.iter().find(|c| c.cluster_center == -1);
    assert_eq!(excluded.map(|c| c.members.len()), Some(1));
}

#[test]
fn feasibility_repair_triggers_on_overfull_square() {
    // Four buildings on a tight square, combined demand exceeding capacity: the
    // bisecting k-means bootstrap (k=1, since K_raw=1 at this capacity) would put all
    // four in one partition; repair must evict at least one to `NON_MEMBER` or a second
    // cluster, since no other partition exists to receive them in a single-group run.
    let buildings = vec![
        building(0, 0.0, 0.0, 30.0),
        building(1, 10.0, 0.0, 30.0),
        building(2, 10.0, 10.0, 30.0),
        building(3, 0.0, 10.0, 30.0),
    ];
    let segments = vec![
        RoadSegment::new(RoadSegmentId::new(0), buildings[0].location, buildings[1].location, "residential"),
        RoadSegment::new(RoadSegmentId::new(1), buildings[1].location, buildings[2].location, "residential"),
        RoadSegment::new(RoadSegmentId::new(2), buildings[2].location, buildings[3].location, "residential"),
        RoadSegment::new(RoadSegmentId::new(3), buildings[3].location, buildings[0].location, "residential"),
    ];
    let config = default_config(100.0);
    let catalogue = parse_catalogue(CATALOGUE).unwrap();
    let prices = PriceTable::parse(PRICES).unwrap();

    let outcome = dhn::run(&buildings, &segments, &config, &catalogue, &prices, None).unwrap();
    for cluster in outcome.design.clusters.iter().filter(|c| c.cluster_center != -1) {
        assert!(cluster.supplied_power <= 100.0 + 1e-6);
    }
}

#[test]
fn warm_start_decodes_back_to_the_seed_assignment() {
    use dhn_brkga::{chromosome_length, decode, encode_warm_start};
    use dhn_core::cluster::ClusterAssignment;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    let buildings = vec![
        building(0, 0.0, 0.0, 10.0),
        building(1, 50.0, 0.0, 10.0),
        building(2, 100.0, 0.0, 10.0),
    ];
    let segments = vec![RoadSegment::new(
        RoadSegmentId::new(0),
        buildings[0].location,
        buildings[2].location,
        "residential",
    )];
    let road_graph = dhn_core::graph::RoadGraphBuilder::new()
        .build(&segments, &buildings)
        .unwrap();
    let config = default_config(1000.0);
    let metric_graph = dhn_core::graph::build_metric_graph(&road_graph, &buildings, &config);
    let demand_of: FxHashMap<_, _> = buildings.iter().map(|b| (b.id, b.peak_demand)).collect();

    let mut cluster_of = FxHashMap::default();
    cluster_of.insert(BuildingId::new(0), 0);
    cluster_of.insert(BuildingId::new(1), 0);
    cluster_of.insert(BuildingId::new(2), 0);
    let seed_assignment = ClusterAssignment::new(cluster_of, vec![BuildingId::new(0)]);

    let universe: Vec<_> = buildings.iter().map(|b| b.id).collect();
    let mut rng = ChaCha8Rng::seed_from_u64(99);
    let chromosome = encode_warm_start(&seed_assignment, &universe, &config, &mut rng);
    assert_eq!(chromosome.len(), chromosome_length(&universe, &config, 1));

    let decoded = decode(&chromosome, &universe, &metric_graph, &demand_of, &config, 1).unwrap();
    assert_eq!(decoded.center_of(0), seed_assignment.center_of(0));
    let mut decoded_members = decoded.members_of(0);
    let mut seed_members = seed_assignment.members_of(0);
    decoded_members.sort_by_key(|b| b.inner());
    seed_members.sort_by_key(|b| b.inner());
    assert_eq!(decoded_members, seed_members);
}

#[test]
fn catalogue_miss_is_penalized_to_constraint_broken() {
    use dhn_core::fitness::evaluate_fitness;

    // Twenty buildings on one branch feeding a single center: the trunk mass flow is far
    // beyond the catalogue's largest listed threshold (10 kg/s), so pricing must fail and
    // fold into the fixed penalty rather than propagate an error to the caller.
    let buildings: Vec<_> = (0..20)
        .map(|i| building(i, i as f64 * 5.0, 0.0, 5000.0))
        .collect();
    let segments = vec![RoadSegment::new(
        RoadSegmentId::new(0),
        buildings[0].location,
        buildings[19].location,
        "residential",
    )];
    let config = default_config(1_000_000.0);
    let catalogue = parse_catalogue(CATALOGUE).unwrap(); // max mass flow row is 10 kg/s
    let prices = PriceTable::parse(PRICES).unwrap();

    let road_graph = dhn_core::graph::RoadGraphBuilder::new()
        .build(&segments, &buildings)
        .unwrap();
    let metric_graph = dhn_core::graph::build_metric_graph(&road_graph, &buildings, &config);
    let demand_of: FxHashMap<_, _> = buildings.iter().map(|b| (b.id, b.peak_demand)).collect();

    let mut cluster_of = FxHashMap::default();
    for b in &buildings {
        cluster_of.insert(b.id, 0);
    }
    let assignment = dhn_core::cluster::ClusterAssignment::new(cluster_of, vec![buildings[0].id]);

    let fitness = evaluate_fitness(&assignment, &metric_graph, &demand_of, &catalogue, &prices, &config);
    assert_eq!(fitness, dhn_core::fitness::CONSTRAINT_BROKEN);
}

#[test]
fn stop_criterion_exits_g_stop_generations_after_the_optimum() {
    use dhn_brkga::EvolutionOutcome;

    let buildings = vec![building(0, 0.0, 0.0, 10.0), building(1, 50.0, 0.0, 10.0)];
    let segments = vec![RoadSegment::new(
        RoadSegmentId::new(0),
        buildings[0].location,
        buildings[1].location,
        "residential",
    )];
    let mut config = default_config(1000.0);
    config.num_generations_to_break = 5;
    let catalogue = parse_catalogue(CATALOGUE).unwrap();
    let prices = PriceTable::parse(PRICES).unwrap();
    let road_graph = dhn_core::graph::RoadGraphBuilder::new()
        .build(&segments, &buildings)
        .unwrap();
    let metric_graph = dhn_core::graph::build_metric_graph(&road_graph, &buildings, &config);
    let demand_of: FxHashMap<_, _> = buildings.iter().map(|b| (b.id, b.peak_demand)).collect();
    let universe: Vec<_> = buildings.iter().map(|b| b.id).collect();

    let outcome: EvolutionOutcome = dhn_brkga::run(
        &universe,
        &metric_graph,
        &demand_of,
        &catalogue,
        &prices,
        &config,
        1,
        None,
        || false,
        |_, _, _, _| {},
    );
    // With only two buildings and one cluster, the search space is trivial enough that
    // the optimum is already found at generation 0; the loop must still run exactly
    // `num_generations_to_break` further generations before stopping.
    assert!(outcome.generations_run >= config.num_generations_to_break);
}
