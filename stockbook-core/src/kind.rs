use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Direction of a posting.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    Purchase,
    Sale,
}

impl TransactionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            TransactionKind::Purchase => "purchase",
            TransactionKind::Sale => "sale",
        }
    }

    /// Purchases are made from suppliers, sales to customers.
    pub fn counterparty_kind(self) -> CounterpartyKind {
        match self {
            TransactionKind::Purchase => CounterpartyKind::Supplier,
            TransactionKind::Sale => CounterpartyKind::Customer,
        }
    }

    /// Which field of the latest-rate record this kind of posting refreshes.
    pub fn price_side(self) -> PriceSide {
        match self {
            TransactionKind::Purchase => PriceSide::Purchase,
            TransactionKind::Sale => PriceSide::Sale,
        }
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "purchase" => Ok(TransactionKind::Purchase),
            "sale" => Ok(TransactionKind::Sale),
            other => Err(format!("unknown transaction kind: {other}")),
        }
    }
}

/// Role a directory entry plays for its owner.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CounterpartyKind {
    Supplier,
    Customer,
}

impl CounterpartyKind {
    pub fn as_str(self) -> &'static str {
        match self {
            CounterpartyKind::Supplier => "supplier",
            CounterpartyKind::Customer => "customer",
        }
    }
}

impl fmt::Display for CounterpartyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CounterpartyKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "supplier" => Ok(CounterpartyKind::Supplier),
            "customer" => Ok(CounterpartyKind::Customer),
            other => Err(format!("unknown counterparty kind: {other}")),
        }
    }
}

/// Selects one of the two independent prices on a rate record.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceSide {
    Purchase,
    Sale,
}

impl PriceSide {
    pub fn as_str(self) -> &'static str {
        match self {
            PriceSide::Purchase => "purchase",
            PriceSide::Sale => "sale",
        }
    }
}

impl fmt::Display for PriceSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PriceSide {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "purchase" => Ok(PriceSide::Purchase),
            "sale" => Ok(PriceSide::Sale),
            other => Err(format!("unknown price side: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_round_trips_through_str() {
        for kind in [TransactionKind::Purchase, TransactionKind::Sale] {
            assert_eq!(kind.as_str().parse::<TransactionKind>().unwrap(), kind);
        }
        assert!("refund".parse::<TransactionKind>().is_err());
    }

    #[test]
    fn purchase_pairs_with_supplier() {
        assert_eq!(
            TransactionKind::Purchase.counterparty_kind(),
            CounterpartyKind::Supplier
        );
        assert_eq!(
            TransactionKind::Sale.counterparty_kind(),
            CounterpartyKind::Customer
        );
        assert_eq!(TransactionKind::Sale.price_side(), PriceSide::Sale);
    }
}
