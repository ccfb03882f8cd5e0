//! The `Building` data model (spec.md §3): a stable identifier, planar coordinates, and
//! peak/annual heating demand. Buildings are immutable once preprocessing emits them.

use serde::{Deserialize, Serialize};

use crate::geometry::Point2;
use crate::ident::BuildingId;
use crate::units::{KiloWattHours, KiloWatts};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, derive_new::new)]
pub struct Building {
    pub id: BuildingId,
    pub location: Point2,
    /// Peak heating demand, used for capacity and mass-flow calculations.
    pub peak_demand: KiloWatts,
    /// Annual heating demand, carried through for reporting but not used by the core.
    pub annual_demand: KiloWattHours,
}
