//! The BRKGA evolution loop (spec.md §4.6, §4.8): a population of chromosomes evolved by
//! elite/mutant/crossover generations, decoded and scored in parallel, stopping once
//! `num_generations_to_break` generations pass without improvement.
//!
//! Per-chromosome decode + fitness evaluation is independent work fanned out across
//! `rayon`, mirroring `parsimon-core::routing::BfsRoutes::new`'s "parallel map, serial
//! rank" shape (spec.md §5): generations are strictly serial, the work within one is not.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use rustc_hash::FxHashMap;

use dhn_core::catalogue::PipeCatalogue;
use dhn_core::config::Config;
use dhn_core::fitness::evaluate_fitness;
use dhn_core::graph::MetricGraph;
use dhn_core::prices::PriceTable;
use dhn_core::units::KiloWatts;
use dhn_core::{BuildingId, ClusterAssignment};

use crate::chromosome::Chromosome;
use crate::decoder::{chromosome_length, decode};
use crate::warm_start::encode_warm_start;

/// Fraction of the population carried over unchanged as elites each generation. Not a
/// configuration knob in spec.md §6; the BRKGA literature's conventional value.
const ELITE_FRACTION: f64 = 0.15;
/// Fraction of the population replaced by fresh random chromosomes ("mutants") each
/// generation.
const MUTANT_FRACTION: f64 = 0.15;
/// Probability a crossover child's gene comes from its elite parent rather than its
/// non-elite parent (spec.md §4.6 step 3).
const CROSSOVER_BIAS: f64 = 0.7;

#[derive(Debug, Clone)]
pub struct EvolutionOutcome {
    pub assignment: ClusterAssignment,
    pub fitness: f64,
    pub generations_run: u32,
    pub cancelled: bool,
}

struct ScoredChromosome {
    chromosome: Chromosome,
    assignment: Option<ClusterAssignment>,
    fitness: f64,
}

/// Runs the BRKGA evolution loop to completion (or until `should_cancel` returns `true`
/// between generations), returning the best decoded assignment found.
#[allow(clippy::too_many_arguments)]
pub fn run(
    universe: &[BuildingId],
    metric_graph: &MetricGraph,
    demand_of: &FxHashMap<BuildingId, KiloWatts>,
    catalogue: &PipeCatalogue,
    prices: &PriceTable,
    config: &Config,
    num_clusters: usize,
    warm_start: Option<&ClusterAssignment>,
    mut should_cancel: impl FnMut() -> bool,
    mut on_generation: impl FnMut(u32, f64, usize, &ClusterAssignment),
) -> EvolutionOutcome {
    let chromosome_len = chromosome_length(universe, config, num_clusters);
    let population_size = ((config.population_factor * chromosome_len as f64).round() as usize).max(4);
    let elite_count = ((population_size as f64 * ELITE_FRACTION).round() as usize).max(1);
    let mutant_count = ((population_size as f64 * MUTANT_FRACTION).round() as usize).max(1);

    let mut master_rng = if config.use_random_seed {
        ChaCha8Rng::from_entropy()
    } else {
        ChaCha8Rng::seed_from_u64(config.seed)
    };

    let mut population: Vec<Chromosome> = (0..population_size)
        .map(|_| Chromosome::random(chromosome_len, &mut master_rng))
        .collect();

    if config.do_warm_start {
        if let Some(seed_assignment) = warm_start {
            population[0] = encode_warm_start(seed_assignment, universe, config, &mut master_rng);
        }
    }

    let mut best_fitness = f64::INFINITY;
    let mut best_assignment: Option<ClusterAssignment> = warm_start.cloned();
    let mut last_improvement_generation: u32 = 0;
    let mut generation: u32 = 0;
    let mut cancelled = false;

    loop {
        let mut scored: Vec<ScoredChromosome> = population
            .into_par_iter()
            .map(|chromosome| {
                let assignment = decode(
                    &chromosome,
                    universe,
                    metric_graph,
                    demand_of,
                    config,
                    num_clusters,
                );
                let fitness = match &assignment {
                    Some(a) => evaluate_fitness(a, metric_graph, demand_of, catalogue, prices, config),
                    None => dhn_core::fitness::CONSTRAINT_BROKEN,
                };
                ScoredChromosome {
                    chromosome,
                    assignment,
                    fitness,
                }
            })
            .collect();

        scored.sort_by(|a, b| a.fitness.partial_cmp(&b.fitness).expect("non-NaN fitness"));

        if scored[0].fitness < best_fitness {
            best_fitness = scored[0].fitness;
            best_assignment = scored[0].assignment.clone();
            last_improvement_generation = generation;
        }
        on_generation(
            generation,
            best_fitness,
            population_size,
            best_assignment
                .as_ref()
                .expect("best_assignment is set above before the first callback"),
        );

        if generation.saturating_sub(last_improvement_generation) >= config.num_generations_to_break {
            population = scored.into_iter().map(|s| s.chromosome).collect();
            break;
        }
        if should_cancel() {
            cancelled = true;
            population = scored.into_iter().map(|s| s.chromosome).collect();
            break;
        }

        let elites: Vec<Chromosome> = scored
            .iter()
            .take(elite_count)
            .map(|s| s.chromosome.clone())
            .collect();
        let non_elites: Vec<Chromosome> = scored
            .iter()
            .skip(elite_count)
            .map(|s| s.chromosome.clone())
            .collect();

        let mut next_gen = Vec::with_capacity(population_size);
        next_gen.extend(elites.iter().cloned());
        for _ in 0..mutant_count {
            next_gen.push(Chromosome::random(chromosome_len, &mut master_rng));
        }
        while next_gen.len() < population_size {
            let elite_parent = &elites[master_rng.gen_range(0..elites.len())];
            let other_parent = if non_elites.is_empty() {
                &elites[master_rng.gen_range(0..elites.len())]
            } else {
                &non_elites[master_rng.gen_range(0..non_elites.len())]
            };
            next_gen.push(Chromosome::crossover(
                elite_parent,
                other_parent,
                CROSSOVER_BIAS,
                &mut master_rng,
            ));
        }
        population = next_gen;
        generation += 1;
    }

    EvolutionOutcome {
        assignment: best_assignment.expect("at least one chromosome decodes in a well-formed run"),
        fitness: best_fitness,
        generations_run: generation,
        cancelled,
    }
}
