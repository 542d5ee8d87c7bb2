use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Number of fractional digits every stored quantity and amount carries.
pub const MONEY_SCALE: u32 = 2;

/// Quantity expressed in the commodity's own unit.
pub type Quantity = Decimal;

/// Price per unit of a commodity.
pub type Price = Decimal;

/// Monetary total of a posting.
pub type Amount = Decimal;

/// Round half-up to [`MONEY_SCALE`] and pin the scale so the canonical text
/// form always has two fractional digits (`100` becomes `100.00`).
pub fn round_money(value: Decimal) -> Decimal {
    let mut rounded =
        value.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(MONEY_SCALE);
    rounded
}

/// Fully resolved numeric fields of a posting, already rounded for storage.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostingAmounts {
    pub quantity: Quantity,
    pub rate: Price,
    pub total: Amount,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn rounds_midpoint_away_from_zero() {
        assert_eq!(round_money(dec!(2.345)).to_string(), "2.35");
        assert_eq!(round_money(dec!(2.344)).to_string(), "2.34");
        assert_eq!(round_money(dec!(0.005)).to_string(), "0.01");
    }

    #[test]
    fn pins_scale_to_two_digits() {
        assert_eq!(round_money(dec!(100)).to_string(), "100.00");
        assert_eq!(round_money(dec!(3.1)).to_string(), "3.10");
    }
}
