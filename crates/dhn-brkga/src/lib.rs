//! The genetic refinement stage (spec.md §4.6, §4.8): chromosome encoding, the decoder,
//! warm-start injection, and the population evolution loop.

pub mod chromosome;
pub mod decoder;
pub mod engine;
pub mod warm_start;

pub use chromosome::Chromosome;
pub use decoder::{chromosome_length, decode};
pub use engine::{run, EvolutionOutcome};
pub use warm_start::encode_warm_start;
