//! The pipe diameter catalogue (spec.md §6): a table indexed by mass-flow threshold and
//! diameter class, giving the pressure gradient each diameter would see at that flow.
//!
//! File format: whitespace-separated, a header row of column names, a header row of
//! units, then data rows; commas are decimal separators; `–` (U+2013) marks an absent
//! cell. Columns after the first (the mass-flow threshold) are diameter classes in
//! ascending-diameter file order.

use rustc_hash::FxHashMap;

use crate::units::KgPerSec;

#[derive(Debug, Clone)]
pub struct CatalogueRow {
    pub mass_flow_threshold: KgPerSec,
    /// Pressure gradient (Pa/m) per diameter class; `None` for an absent cell.
    pub pressure_gradients: FxHashMap<String, Option<f64>>,
}

/// A parsed pipe catalogue: diameter classes in ascending-diameter order, rows sorted
/// ascending by mass-flow threshold.
#[derive(Debug, Clone)]
pub struct PipeCatalogue {
    pub diameter_classes: Vec<String>,
    pub rows: Vec<CatalogueRow>,
}

#[derive(Debug, thiserror::Error)]
pub enum CatalogueError {
    #[error("catalogue file has fewer than 3 lines (names, units, at least one data row)")]
    TooFewLines,

    #[error("line {line}: expected {expected} columns, found {found}")]
    ColumnCountMismatch {
        line: usize,
        expected: usize,
        found: usize,
    },

    #[error("line {line}: cannot parse mass-flow threshold `{value}`")]
    BadMassFlow { line: usize, value: String },

    #[error("line {line}: mass-flow threshold {value} is not strictly greater than the previous row's")]
    NonAscendingMassFlow { line: usize, value: f64 },
}

/// A single decimal token using `,` as the decimal separator, or the absent-value marker
/// `–` (U+2013).
fn parse_cell(token: &str) -> Option<f64> {
    if token == "\u{2013}" {
        return None;
    }
    token.replace(',', ".").parse::<f64>().ok()
}

pub fn parse_catalogue(input: &str) -> Result<PipeCatalogue, CatalogueError> {
    let mut lines = input.lines().filter(|l| !l.trim().is_empty());
    let names_line = lines.next().ok_or(CatalogueError::TooFewLines)?;
    let _units_line = lines.next().ok_or(CatalogueError::TooFewLines)?;

    let names: Vec<&str> = names_line.split_whitespace().collect();
    if names.len() < 2 {
        return Err(CatalogueError::ColumnCountMismatch {
            line: 1,
            expected: 2,
            found: names.len(),
        });
    }
    let diameter_classes: Vec<String> = names[1..].iter().map(|s| s.to_string()).collect();

    let mut rows = Vec::new();
    let mut prev_threshold: Option<f64> = None;
    for (offset, line) in lines.enumerate() {
        let line_no = offset + 3;
        let tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.len() != names.len() {
            return Err(CatalogueError::ColumnCountMismatch {
                line: line_no,
                expected: names.len(),
                found: tokens.len(),
            });
        }
        let threshold = parse_cell(tokens[0]).ok_or_else(|| CatalogueError::BadMassFlow {
            line: line_no,
            value: tokens[0].to_string(),
        })?;
        if let Some(prev) = prev_threshold {
            if threshold <= prev {
                return Err(CatalogueError::NonAscendingMassFlow {
                    line: line_no,
                    value: threshold,
                });
            }
        }
        prev_threshold = Some(threshold);

        let mut pressure_gradients = FxHashMap::default();
        for (class, token) in diameter_classes.iter().zip(&tokens[1..]) {
            pressure_gradients.insert(class.clone(), parse_cell(token));
        }
        rows.push(CatalogueRow {
            mass_flow_threshold: KgPerSec::new(threshold),
            pressure_gradients,
        });
    }

    Ok(PipeCatalogue {
        diameter_classes,
        rows,
    })
}

/// The result of selecting a pipe diameter for a required mass flow (spec.md §4.7).
#[derive(Debug, Clone)]
pub struct DiameterSelection {
    pub diameter_class: String,
    pub pressure_gradient: f64,
}

impl PipeCatalogue {
    /// Finds the smallest-diameter class able to carry `mass_flow` below
    /// `pressure_loss_threshold` (Pa/m). `None` means a catalogue miss: no row has a
    /// mass-flow capacity at or above `mass_flow`, or every diameter at that row exceeds
    /// the pressure-gradient threshold.
    pub fn select_diameter(
        &self,
        mass_flow: KgPerSec,
        pressure_loss_threshold: f64,
    ) -> Option<DiameterSelection> {
        let row = self
            .rows
            .iter()
            .find(|r| r.mass_flow_threshold.into_f64() >= mass_flow.into_f64())?;
        for class in &self.diameter_classes {
            if let Some(Some(gradient)) = row.pressure_gradients.get(class) {
                if *gradient < pressure_loss_threshold {
                    return Some(DiameterSelection {
                        diameter_class: class.clone(),
                        pressure_gradient: *gradient,
                    });
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "mass_flow DN25 DN32 DN40\nkg/s Pa/m Pa/m Pa/m\n0,5 120,5 80,2 \u{2013}\n1,0 300,1 150,0 90,5\n";

    #[test]
    fn parses_decimal_commas_and_absent_marker() {
        let cat = parse_catalogue(SAMPLE).unwrap();
        assert_eq!(cat.diameter_classes, vec!["DN25", "DN32", "DN40"]);
        assert_eq!(cat.rows.len(), 2);
        assert_eq!(cat.rows[0].mass_flow_threshold.into_f64(), 0.5);
        assert_eq!(cat.rows[0].pressure_gradients["DN40"], None);
    }

    #[test]
    fn selects_smallest_diameter_under_threshold() {
        let cat = parse_catalogue(SAMPLE).unwrap();
        let sel = cat.select_diameter(KgPerSec::new(0.4), 250.0).unwrap();
        assert_eq!(sel.diameter_class, "DN32");
    }

    #[test]
    fn catalogue_miss_when_flow_exceeds_every_row() {
        let cat = parse_catalogue(SAMPLE).unwrap();
        assert!(cat.select_diameter(KgPerSec::new(5.0), 250.0).is_none());
    }

    #[test]
    fn rejects_non_ascending_thresholds() {
        let bad = "mass_flow DN25\nkg/s Pa/m\n1,0 10,0\n0,5 20,0\n";
        assert!(matches!(
            parse_catalogue(bad),
            Err(CatalogueError::NonAscendingMassFlow { .. })
        ));
    }
}
