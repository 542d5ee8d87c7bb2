use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use stockbook_core::{
    CommodityId, CounterpartyId, CounterpartyKind, CounterpartySnapshot, OwnerId, PriceSide,
    TransactionKind, UnitOfMeasure,
};
use uuid::Uuid;

/// Immutable record of a single purchase or sale.
///
/// Commodity and counterparty details are copies taken when the record was
/// written; later edits to the catalog or directory never reach them.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRecord {
    pub id: Uuid,
    pub owner: OwnerId,
    pub kind: TransactionKind,
    pub commodity_id: CommodityId,
    pub commodity_name: String,
    pub unit: UnitOfMeasure,
    pub quantity: Decimal,
    pub rate: Decimal,
    pub total: Decimal,
    pub secondary_quantity: Option<Decimal>,
    /// Supplier for purchases, customer for sales.
    pub counterparty_id: CounterpartyId,
    pub counterparty: CounterpartySnapshot,
    pub note: Option<String>,
    pub event_time: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl TransactionRecord {
    pub fn counterparty_kind(&self) -> CounterpartyKind {
        self.kind.counterparty_kind()
    }

    pub fn supplier_id(&self) -> Option<&CounterpartyId> {
        match self.kind {
            TransactionKind::Purchase => Some(&self.counterparty_id),
            TransactionKind::Sale => None,
        }
    }

    pub fn customer_id(&self) -> Option<&CounterpartyId> {
        match self.kind {
            TransactionKind::Purchase => None,
            TransactionKind::Sale => Some(&self.counterparty_id),
        }
    }
}

/// Running stock position of one commodity for one owner.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryRecord {
    pub owner: OwnerId,
    pub commodity_id: CommodityId,
    pub commodity_name: String,
    pub unit: UnitOfMeasure,
    pub purchased: Decimal,
    pub sold: Decimal,
    pub balance: Decimal,
    pub updated_at: DateTime<Utc>,
}

/// Latest observed purchase and sale price of one commodity for one owner.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateRecord {
    pub owner: OwnerId,
    pub commodity_id: CommodityId,
    pub commodity_name: String,
    pub purchase_price: Option<Decimal>,
    pub sale_price: Option<Decimal>,
    pub fetched_at: DateTime<Utc>,
}

impl RateRecord {
    pub fn price(&self, side: PriceSide) -> Option<Decimal> {
        match side {
            PriceSide::Purchase => self.purchase_price,
            PriceSide::Sale => self.sale_price,
        }
    }
}

/// One line of a per-side rate listing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateQuote {
    pub commodity_id: CommodityId,
    pub commodity_name: String,
    pub unit: Option<UnitOfMeasure>,
    pub side: PriceSide,
    pub price: Decimal,
    pub last_updated: DateTime<Utc>,
}
