//! Core data model, graph construction, and fitness evaluation for district heating
//! network design: buildings and road segments in, a capacity-respecting clustering and
//! pipe-tree layout out, scored by annualized cost per unit of peak demand served.

#[macro_use]
mod ident;
#[macro_use]
mod units;

pub mod building;
pub mod catalogue;
pub mod cluster;
pub mod config;
pub mod error;
pub mod fitness;
pub mod geometry;
pub mod graph;
pub mod massflow;
pub mod pipe;
pub mod prices;
pub mod road;
pub mod tree;

pub use building::Building;
pub use cluster::ClusterAssignment;
pub use config::Config;
pub use error::DhnError;
pub use fitness::{evaluate_fitness, FitnessError, CONSTRAINT_BROKEN};
pub use graph::{build_metric_graph, build_road_graph, MetricGraph, RoadGraph, RoadGraphBuilder};
pub use ident::{BuildingId, RoadNodeId, RoadSegmentId};
pub use road::RoadSegment;
