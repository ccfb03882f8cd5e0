//! Pipe prices (spec.md §6): JSON mapping catalogue column name to pipe layout, outer
//! diameter, and per-meter price.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

/// Trench layout a pipe diameter class is installed in (spec.md §4.7): `uno` is a single
/// pipe, `duo` is a twin pipe sharing one trench.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PipeLayout {
    Uno,
    Duo,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipePrice {
    #[serde(rename = "type")]
    pub layout: PipeLayout,
    /// Outer diameter, millimeters.
    pub outer_diameter: f64,
    /// Price per meter of pipe, currency units.
    pub price: f64,
}

/// Maps catalogue diameter-class column name to its price entry.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PriceTable(pub FxHashMap<String, PipePrice>);

#[derive(Debug, thiserror::Error)]
pub enum PriceError {
    #[error("failed to parse price table JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("price table has no entry for diameter class `{class}`")]
    MissingClass { class: String },
}

impl PriceTable {
    pub fn parse(input: &str) -> Result<Self, PriceError> {
        Ok(serde_json::from_str(input)?)
    }

    pub fn get(&self, diameter_class: &str) -> Result<&PipePrice, PriceError> {
        self.0
            .get(diameter_class)
            .ok_or_else(|| PriceError::MissingClass {
                class: diameter_class.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_price_table_json() {
        let json = r#"{
            "DN25": {"type": "uno", "outer_diameter": 32.0, "price": 45.5},
            "DN32": {"type": "duo", "outer_diameter": 40.0, "price": 60.0}
        }"#;
        let table = PriceTable::parse(json).unwrap();
        let dn25 = table.get("DN25").unwrap();
        assert_eq!(dn25.layout, PipeLayout::Uno);
        assert_eq!(dn25.outer_diameter, 32.0);
        assert!(table.get("DN99").is_err());
    }
}
