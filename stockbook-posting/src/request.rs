use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use stockbook_core::{CommodityId, CounterpartyId, TransactionKind};
use stockbook_ledger::{InventoryRecord, TransactionRecord};
use uuid::Uuid;

use crate::AmountInputs;

/// Body of a purchase or sale request.
///
/// Decimals accept JSON numbers or strings. `supplierId`/`customerId` are
/// read as the counterparty id.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostingRequest {
    #[serde(default)]
    pub commodity_id: Option<CommodityId>,
    #[serde(default, alias = "supplierId", alias = "customerId")]
    pub counterparty_id: Option<CounterpartyId>,
    #[serde(default)]
    pub quantity: Option<Decimal>,
    #[serde(default, alias = "ratePerUnit")]
    pub rate: Option<Decimal>,
    #[serde(default, alias = "totalAmount")]
    pub total: Option<Decimal>,
    #[serde(default, alias = "notes")]
    pub note: Option<String>,
    #[serde(default, alias = "dateTime")]
    pub event_time: Option<DateTime<Utc>>,
}

impl PostingRequest {
    pub fn new(
        commodity_id: impl Into<CommodityId>,
        counterparty_id: impl Into<CounterpartyId>,
    ) -> Self {
        Self {
            commodity_id: Some(commodity_id.into()),
            counterparty_id: Some(counterparty_id.into()),
            ..Self::default()
        }
    }

    pub fn with_quantity(mut self, quantity: Decimal) -> Self {
        self.quantity = Some(quantity);
        self
    }

    pub fn with_rate(mut self, rate: Decimal) -> Self {
        self.rate = Some(rate);
        self
    }

    pub fn with_total(mut self, total: Decimal) -> Self {
        self.total = Some(total);
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    pub fn with_event_time(mut self, event_time: DateTime<Utc>) -> Self {
        self.event_time = Some(event_time);
        self
    }

    pub fn amount_inputs(&self) -> AmountInputs {
        AmountInputs {
            quantity: self.quantity,
            rate: self.rate,
            total: self.total,
        }
    }
}

/// Acknowledgement of a committed posting.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostingReceipt {
    pub transaction_id: Uuid,
    pub kind: TransactionKind,
    pub quantity: Decimal,
    pub rate: Decimal,
    pub total: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secondary_quantity: Option<Decimal>,
    pub balance_after: Decimal,
}

/// Everything a committed posting wrote.
#[derive(Clone, Debug)]
pub struct PostingOutcome {
    pub transaction: TransactionRecord,
    pub inventory: InventoryRecord,
}

impl PostingOutcome {
    pub fn receipt(&self) -> PostingReceipt {
        PostingReceipt {
            transaction_id: self.transaction.id,
            kind: self.transaction.kind,
            quantity: self.transaction.quantity,
            rate: self.transaction.rate,
            total: self.transaction.total,
            secondary_quantity: self.transaction.secondary_quantity,
            balance_after: self.inventory.balance,
        }
    }
}
