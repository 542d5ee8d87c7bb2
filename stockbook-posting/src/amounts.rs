use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use stockbook_core::{round_money, Amount, PostingAmounts, Price, Quantity};

use crate::{PostingError, PostingResult};

/// Default allowed gap between a supplied total and `quantity * rate`.
pub const DEFAULT_TOLERANCE: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

/// Largest quantity or rate a posting may carry (`99999999.99`).
pub const MAX_UNIT_VALUE: Decimal = Decimal::from_parts(0x540b_e3ff, 0x2, 0, false, 2);

/// Largest total a posting may carry (`9999999999.99`).
pub const MAX_TOTAL: Decimal = Decimal::from_parts(0xd4a5_0fff, 0xe8, 0, false, 2);

/// The numeric fields of a request before derivation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AmountInputs {
    pub quantity: Option<Quantity>,
    pub rate: Option<Price>,
    pub total: Option<Amount>,
}

impl AmountInputs {
    fn supplied(&self) -> usize {
        [self.quantity, self.rate, self.total]
            .iter()
            .filter(|value| value.is_some())
            .count()
    }
}

/// How a request that supplies quantity, rate and total together is treated.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ConsistencyMode {
    /// Store all three values as given.
    Trust,
    /// Reject the request unless `|total - quantity * rate| <= tolerance`.
    Strict { tolerance: Decimal },
}

impl Default for ConsistencyMode {
    fn default() -> Self {
        Self::Strict {
            tolerance: DEFAULT_TOLERANCE,
        }
    }
}

/// Fill in the one missing field of quantity, rate and total, rounding every
/// value to two places.
///
/// Supplied values are rounded before they take part in a derivation, so a
/// derived total always equals `round(quantity * rate)` of the stored values.
pub fn resolve_amounts(
    inputs: AmountInputs,
    consistency: ConsistencyMode,
) -> PostingResult<PostingAmounts> {
    if inputs.supplied() < 2 {
        return Err(PostingError::validation(
            "at least two of quantity, rate and total are required",
        ));
    }
    let quantity = inputs.quantity.map(round_money);
    let rate = inputs.rate.map(round_money);
    let total = inputs.total.map(round_money);
    for (field, value) in [("quantity", quantity), ("rate", rate), ("total", total)] {
        if value.is_some_and(|value| value.is_sign_negative() && !value.is_zero()) {
            return Err(PostingError::validation(format!("{field} must not be negative")));
        }
    }

    let amounts = match (quantity, rate, total) {
        (None, Some(rate), Some(total)) => {
            if rate.is_zero() {
                return Err(PostingError::validation(
                    "rate must be non-zero to derive quantity",
                ));
            }
            PostingAmounts {
                quantity: round_money(checked(total.checked_div(rate))?),
                rate,
                total,
            }
        }
        (Some(quantity), None, Some(total)) => {
            if quantity.is_zero() {
                return Err(PostingError::validation(
                    "quantity must be non-zero to derive rate",
                ));
            }
            PostingAmounts {
                quantity,
                rate: round_money(checked(total.checked_div(quantity))?),
                total,
            }
        }
        (Some(quantity), Some(rate), None) => PostingAmounts {
            quantity,
            rate,
            total: round_money(checked(quantity.checked_mul(rate))?),
        },
        (Some(quantity), Some(rate), Some(total)) => {
            if let ConsistencyMode::Strict { tolerance } = consistency {
                let expected = round_money(checked(quantity.checked_mul(rate))?);
                if (total - expected).abs() > tolerance {
                    return Err(PostingError::validation(format!(
                        "total {total} does not match quantity {quantity} x rate {rate} \
                         (expected {expected})"
                    )));
                }
            }
            PostingAmounts {
                quantity,
                rate,
                total,
            }
        }
        _ => {
            return Err(PostingError::validation(
                "at least two of quantity, rate and total are required",
            ))
        }
    };

    if amounts.quantity.is_zero() {
        return Err(PostingError::validation("quantity must be greater than zero"));
    }
    for (field, value, max) in [
        ("quantity", amounts.quantity, MAX_UNIT_VALUE),
        ("rate", amounts.rate, MAX_UNIT_VALUE),
        ("total", amounts.total, MAX_TOTAL),
    ] {
        if value > max {
            return Err(PostingError::validation(format!("{field} must not exceed {max}")));
        }
    }
    Ok(amounts)
}

fn checked(value: Option<Decimal>) -> PostingResult<Decimal> {
    value.ok_or_else(|| PostingError::validation("amount is out of range"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn inputs(
        quantity: Option<Decimal>,
        rate: Option<Decimal>,
        total: Option<Decimal>,
    ) -> AmountInputs {
        AmountInputs {
            quantity,
            rate,
            total,
        }
    }

    fn resolve(input: AmountInputs) -> PostingResult<PostingAmounts> {
        resolve_amounts(input, ConsistencyMode::default())
    }

    #[test]
    fn derives_quantity_from_rate_and_total() {
        let amounts = resolve(inputs(None, Some(dec!(50)), Some(dec!(5000)))).unwrap();
        assert_eq!(amounts.quantity.to_string(), "100.00");
        assert_eq!(amounts.rate.to_string(), "50.00");
        assert_eq!(amounts.total.to_string(), "5000.00");
    }

    #[test]
    fn derives_rate_from_quantity_and_total() {
        let amounts = resolve(inputs(Some(dec!(100)), None, Some(dec!(5000)))).unwrap();
        assert_eq!(amounts.rate.to_string(), "50.00");
    }

    #[test]
    fn derives_total_from_quantity_and_rate() {
        let amounts = resolve(inputs(Some(dec!(100)), Some(dec!(50)), None)).unwrap();
        assert_eq!(amounts.total.to_string(), "5000.00");

        let amounts = resolve(inputs(Some(dec!(3)), Some(dec!(33.335)), None)).unwrap();
        assert_eq!(amounts.rate, dec!(33.34));
        assert_eq!(amounts.total, dec!(100.02));
    }

    #[test]
    fn derived_quantity_rounds_half_up() {
        let amounts = resolve(inputs(None, Some(dec!(3)), Some(dec!(100)))).unwrap();
        assert_eq!(amounts.quantity, dec!(33.33));
        let amounts = resolve(inputs(None, Some(dec!(8)), Some(dec!(0.4)))).unwrap();
        assert_eq!(amounts.quantity, dec!(0.05));
    }

    #[test]
    fn fewer_than_two_fields_is_rejected() {
        assert!(matches!(
            resolve(inputs(Some(dec!(1)), None, None)),
            Err(PostingError::Validation(_))
        ));
        assert!(matches!(
            resolve(AmountInputs::default()),
            Err(PostingError::Validation(_))
        ));
    }

    #[test]
    fn zero_divisors_and_negatives_are_rejected() {
        assert!(resolve(inputs(None, Some(dec!(0)), Some(dec!(10)))).is_err());
        assert!(resolve(inputs(Some(dec!(0)), None, Some(dec!(10)))).is_err());
        assert!(resolve(inputs(Some(dec!(-1)), Some(dec!(5)), None)).is_err());
        assert!(resolve(inputs(Some(dec!(0.001)), Some(dec!(5)), None)).is_err());
    }

    #[test]
    fn out_of_range_amounts_are_rejected() {
        assert_eq!(MAX_UNIT_VALUE, dec!(99999999.99));
        assert_eq!(MAX_TOTAL, dec!(9999999999.99));
        assert!(resolve(inputs(Some(dec!(99999999.99)), Some(dec!(1)), None)).is_ok());
        assert!(resolve(inputs(Some(dec!(100000000)), Some(dec!(1)), None)).is_err());
        assert!(resolve(inputs(Some(dec!(100000)), Some(dec!(100000)), None)).is_err());
        let huge = dec!(50000000000000000000000000000);
        assert!(matches!(
            resolve_amounts(inputs(Some(huge), None, Some(huge)), ConsistencyMode::Trust),
            Err(PostingError::Validation(_))
        ));
    }

    #[test]
    fn strict_mode_checks_full_triples() {
        assert!(resolve(inputs(Some(dec!(100)), Some(dec!(50)), Some(dec!(5000.01)))).is_ok());
        assert!(resolve(inputs(Some(dec!(100)), Some(dec!(50)), Some(dec!(4000)))).is_err());

        let trusted = resolve_amounts(
            inputs(Some(dec!(100)), Some(dec!(50)), Some(dec!(4000))),
            ConsistencyMode::Trust,
        )
        .unwrap();
        assert_eq!(trusted.total, dec!(4000));
    }
}
