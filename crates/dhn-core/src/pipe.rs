//! Pipe sizing and per-edge cost (spec.md §4.7 steps 5–6): catalogue lookup, trench
//! cross-section, and the resulting pipe + trench cost for one tree edge.

use crate::catalogue::PipeCatalogue;
use crate::ident::{BuildingId, RoadSegmentId};
use crate::prices::{PipeLayout, PriceTable};
use crate::units::{Currency, KgPerSec};

/// Pressure-gradient ceiling a chosen diameter must stay under (Pa/m, spec.md §9).
pub const PRESSURE_LOSS_THRESHOLD: f64 = 250.0;

/// A sized, priced pipe for one tree edge (spec.md §3).
#[derive(Debug, Clone)]
pub struct Pipe {
    pub from_building: BuildingId,
    pub to_building: BuildingId,
    pub segment_ids: Vec<RoadSegmentId>,
    pub length: f64,
    pub diameter_class: String,
    pub mass_flow: KgPerSec,
    pub pipe_cost: Currency,
    pub trench_cost: Currency,
}

impl Pipe {
    pub fn total_cost(&self) -> Currency {
        self.pipe_cost + self.trench_cost
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PipeSizingError {
    #[error("no catalogue diameter carries {mass_flow} kg/s below {threshold} Pa/m")]
    CatalogueMiss { mass_flow: f64, threshold: f64 },

    #[error(transparent)]
    Price(#[from] crate::prices::PriceError),
}

/// Trench cross-section (m²) for a pipe of outer diameter `outer_diameter_m` (spec.md
/// §4.7 step 6). Dimensions follow the fixed clearances given in the specification.
pub fn trench_cross_section(layout: PipeLayout, outer_diameter_m: f64) -> f64 {
    let width = match layout {
        PipeLayout::Uno => 0.1 + outer_diameter_m + 0.1,
        PipeLayout::Duo => 0.1 + 2.0 * outer_diameter_m + 0.2,
    };
    let depth = 0.8 + outer_diameter_m + 0.1;
    depth * width
}

/// Sizes and prices one pipe from the tree edge's mass flow, catalogue, and price table.
pub fn size_pipe(
    from_building: BuildingId,
    to_building: BuildingId,
    segment_ids: Vec<RoadSegmentId>,
    length: f64,
    mass_flow: KgPerSec,
    catalogue: &PipeCatalogue,
    prices: &PriceTable,
    trench_cost_per_cubic_m: Currency,
) -> Result<Pipe, PipeSizingError> {
    let selection = catalogue
        .select_diameter(mass_flow, PRESSURE_LOSS_THRESHOLD)
        .ok_or(PipeSizingError::CatalogueMiss {
            mass_flow: mass_flow.into_f64(),
            threshold: PRESSURE_LOSS_THRESHOLD,
        })?;
    let price = prices.get(&selection.diameter_class)?;
    let outer_diameter_m = price.outer_diameter / 1000.0;

    let pipe_cost = Currency::new(price.price * length);
    let cross_section = trench_cross_section(price.layout, outer_diameter_m);
    let trench_cost = Currency::new(trench_cost_per_cubic_m.into_f64() * cross_section * length);

    Ok(Pipe {
        from_building,
        to_building,
        segment_ids,
        length,
        diameter_class: selection.diameter_class,
        mass_flow,
        pipe_cost,
        trench_cost,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uno_cross_section_matches_formula() {
        let cs = trench_cross_section(PipeLayout::Uno, 0.1);
        assert!((cs - (0.8 + 0.1 + 0.1) * (0.1 + 0.1 + 0.1)).abs() < 1e-9);
    }

    #[test]
    fn duo_cross_section_matches_formula() {
        let cs = trench_cross_section(PipeLayout::Duo, 0.1);
        assert!((cs - (0.8 + 0.1 + 0.1) * (0.1 + 2.0 * 0.1 + 0.2)).abs() < 1e-9);
    }
}
