use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::money::{round_money, Quantity};

/// Mass units that make up one standard bundle (one "mann").
pub const BUNDLE_SIZE: u32 = 40;

const MASS_UNITS: &[&str] = &["kg", "kgs", "kilogram", "kilograms"];

/// Unit of measure as recorded in the commodity catalog.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UnitOfMeasure(String);

impl UnitOfMeasure {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the unit is a weight unit, compared case-insensitively.
    pub fn is_mass(&self) -> bool {
        let normalized = self.0.trim().to_ascii_lowercase();
        MASS_UNITS.contains(&normalized.as_str())
    }

    /// Bundle-count equivalent of `quantity`, present only for mass units.
    pub fn secondary_quantity(&self, quantity: Quantity) -> Option<Quantity> {
        if !self.is_mass() {
            return None;
        }
        Some(round_money(quantity / Decimal::from(BUNDLE_SIZE)))
    }
}

impl fmt::Display for UnitOfMeasure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UnitOfMeasure {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for UnitOfMeasure {
    fn from(value: String) -> Self {
        Self(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn mass_units_are_case_insensitive() {
        assert!(UnitOfMeasure::from("KG").is_mass());
        assert!(UnitOfMeasure::from(" Kilograms ").is_mass());
        assert!(!UnitOfMeasure::from("litre").is_mass());
        assert!(!UnitOfMeasure::from("g").is_mass());
    }

    #[test]
    fn secondary_quantity_divides_by_bundle_size() {
        let kg = UnitOfMeasure::from("kg");
        assert_eq!(kg.secondary_quantity(dec!(100)), Some(dec!(2.50)));
        assert_eq!(kg.secondary_quantity(dec!(10.00)), Some(dec!(0.25)));
        // 1 / 40 = 0.025 rounds half-up
        assert_eq!(
            kg.secondary_quantity(dec!(1)).map(|q| q.to_string()),
            Some("0.03".to_string())
        );
        assert_eq!(UnitOfMeasure::from("litre").secondary_quantity(dec!(100)), None);
    }
}
