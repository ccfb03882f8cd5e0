//! The `RoadSegment` data model (spec.md §3): a stable identifier, an ordered pair of
//! endpoints, a length, and a type tag used for the street-type cost multiplier.

use serde::{Deserialize, Serialize};

use crate::geometry::Point2;
use crate::ident::RoadSegmentId;
use crate::units::Meters;

/// A road-type tag (OSM `fclass`-style), used to look up the cost multiplier in
/// `Config::street_type_multipliers`.
pub type RoadType = String;

#[derive(Debug, Clone, Serialize, Deserialize, derive_new::new)]
pub struct RoadSegment {
    pub id: RoadSegmentId,
    pub a: Point2,
    pub b: Point2,
    #[new(into)]
    pub road_type: RoadType,
}

impl RoadSegment {
    pub fn length(&self) -> Meters {
        self.a.distance(self.b)
    }
}
