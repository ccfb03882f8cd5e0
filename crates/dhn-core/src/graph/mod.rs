//! Graph construction (spec.md §4.1, §4.2): the street-following road graph and the
//! derived complete metric graph over buildings.

pub mod metric_graph;
pub mod road_graph;

pub use metric_graph::{build_metric_graph, MetricEdge, MetricGraph};
pub use road_graph::{
    build_road_graph, GraphError, RoadEdge, RoadGraph, RoadGraphBuilder, RoadNode, RoadNodeKind,
};
