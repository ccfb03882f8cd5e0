//! Pipeline configuration (spec.md §6), built with `typed_builder` the way the teacher
//! builds `SimOpts`. Every field is enumerated in the specification; this struct is the
//! single source of truth the rest of the crate reads from instead of any global.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

use crate::road::RoadType;
use crate::units::{Currency, KiloWatts};

/// How candidate pipe routes are derived from buildings and roads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InstallationStrategy {
    /// Pipes follow the road network (the default).
    StreetFollowing,
    /// `G_r` is replaced by the complete Euclidean graph on buildings.
    Greenfield,
    /// Building-to-building edges are added alongside road edges.
    Adjacent,
}

/// How building-to-building distance is measured for the first-stage clusterer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DistanceMeasuringMethod {
    Centroids,
    NearestPoint,
    /// Uses the §4.2 cost-weighted adjacency (`w_ij · f_ij`).
    Custom,
}

/// How the BRKGA decoder's pivot token behaves (spec.md §4.6, §9).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PivotStrategy {
    None,
    Single,
    /// Not specified in the source; rejected at configuration time (see DESIGN.md).
    Double,
}

#[derive(Debug, Clone, TypedBuilder, Serialize, Deserialize)]
pub struct Config {
    #[builder(default = InstallationStrategy::StreetFollowing)]
    pub installation_strategy: InstallationStrategy,

    #[builder(default = DistanceMeasuringMethod::Custom)]
    pub distance_measuring_method: DistanceMeasuringMethod,

    /// Heat-source capacity (kW). Must be positive.
    pub heat_capacity: KiloWatts,

    /// `min_samples` fraction for DBSCAN: `floor(capacity * this)`.
    #[builder(default = 0.5)]
    pub minimum_heat_capacity_exhaustion: f64,

    pub fixed_cost: Currency,
    pub trench_cost_per_cubic_m: Currency,

    /// DBSCAN `eps`, in cost units (`w_ij * f_ij`), not raw meters.
    pub eps: f64,

    /// Shrinks the bisecting k-means bootstrap's cluster count to leave the GA room to
    /// pivot new clusters into existence.
    #[builder(default = 0.1)]
    pub decrease_max_clusters_to_find_pctg: f64,

    #[builder(default = 0.0)]
    pub insulation_factor: f64,

    #[builder(default = 25)]
    pub life_time_in_years: u32,

    #[builder(default)]
    pub street_type_multipliers: HashMap<RoadType, f64>,

    #[builder(default)]
    pub excluded_road_fclasses: HashSet<RoadType>,

    #[builder(default = PivotStrategy::Single)]
    pub pivot_strategy: PivotStrategy,

    #[builder(default = 2.0)]
    pub population_factor: f64,

    #[builder(default = 30)]
    pub num_generations_to_break: u32,

    #[builder(default = true)]
    pub do_warm_start: bool,

    #[builder(default = false)]
    pub use_random_seed: bool,

    #[builder(default = 1)]
    pub seed: u64,

    #[builder(default = false)]
    pub save_graph: bool,

    #[builder(default = false)]
    pub load_graph: bool,

    #[builder(default)]
    pub graph_file_name: Option<String>,
}

impl Config {
    /// Returns the street-type cost multiplier for a road type, defaulting to `1.0` for
    /// tags not present in `street_type_multipliers` (spec.md §6).
    pub fn multiplier_for(&self, road_type: &str) -> f64 {
        self.street_type_multipliers
            .get(road_type)
            .copied()
            .unwrap_or(1.0)
    }

    /// Validates the configuration, raising every contradiction the specification calls
    /// out as a fatal configuration error (spec.md §7).
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.heat_capacity.into_f64() <= 0.0 {
            return Err(ConfigError::NonPositive {
                key: "heat-capacity",
            });
        }
        if !(0.0..=1.0).contains(&self.minimum_heat_capacity_exhaustion) {
            return Err(ConfigError::OutOfRange {
                key: "minimum-heat-capacity-exhaustion",
            });
        }
        if self.eps < 0.0 {
            return Err(ConfigError::NonPositive { key: "eps" });
        }
        if self.fixed_cost.into_f64() < 0.0 || self.trench_cost_per_cubic_m.into_f64() < 0.0 {
            return Err(ConfigError::NonPositive { key: "fixed-cost" });
        }
        if matches!(self.pivot_strategy, PivotStrategy::Double) {
            return Err(ConfigError::UnsupportedPivotStrategy);
        }
        if self.population_factor <= 0.0 {
            return Err(ConfigError::NonPositive {
                key: "population-factor",
            });
        }
        Ok(())
    }
}

/// Configuration errors (spec.md §7): fatal, raised before any computation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config key `{key}` must be positive")]
    NonPositive { key: &'static str },

    #[error("config key `{key}` is out of range")]
    OutOfRange { key: &'static str },

    #[error("pivot-strategy `double` has no specified decoder behavior and is rejected")]
    UnsupportedPivotStrategy,

    #[error("missing required config key `{key}`")]
    MissingKey { key: &'static str },

    #[error("invalid enum value `{value}` for config key `{key}`")]
    InvalidEnumValue { key: &'static str, value: String },

    #[error("config file `{path}` is unreachable: {source}")]
    UnreachableFile {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_double_pivot_strategy() {
        let cfg = Config::builder()
            .heat_capacity(KiloWatts::new(100.0))
            .fixed_cost(Currency::new(1000.0))
            .trench_cost_per_cubic_m(Currency::new(50.0))
            .eps(10.0)
            .pivot_strategy(PivotStrategy::Double)
            .build();
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::UnsupportedPivotStrategy)
        ));
    }

    #[test]
    fn accepts_reasonable_defaults() {
        let cfg = Config::builder()
            .heat_capacity(KiloWatts::new(100.0))
            .fixed_cost(Currency::new(1000.0))
            .trench_cost_per_cubic_m(Currency::new(50.0))
            .eps(10.0)
            .build();
        assert!(cfg.validate().is_ok());
    }
}
