//! Crate-wide error aggregation, following `parsimon_core::run::Error`'s shape: one
//! `thiserror` enum per module boundary, aggregated here with `#[from]` so callers can
//! propagate with a single `?`.

use crate::config::ConfigError;
use crate::fitness::FitnessError;
use crate::graph::road_graph::GraphError;

/// Input errors (spec.md §7): fatal, reported once, aborts the run.
#[derive(Debug, thiserror::Error)]
pub enum InputError {
    #[error("selection is empty")]
    EmptySelection,

    #[error("expected exactly one feature in the selection layer, found {found}")]
    SelectionFeatureCount { found: usize },

    #[error("input CRS `{found}` does not match the expected planar CRS `{expected}`")]
    CrsMismatch { expected: String, found: String },

    #[error("building {building} has undefined demand")]
    UndefinedDemand { building: crate::ident::BuildingId },
}

/// Top-level error type aggregating every fatal error surface of the pipeline.
#[derive(Debug, thiserror::Error)]
pub enum DhnError {
    #[error("invalid configuration")]
    Config(#[from] ConfigError),

    #[error("invalid input")]
    Input(#[from] InputError),

    #[error("graph construction failed")]
    Graph(#[from] GraphError),

    #[error("final assignment could not be priced")]
    Fitness(#[from] FitnessError),
}
