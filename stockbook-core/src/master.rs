use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{CommodityId, CounterpartyId, CounterpartyKind, OwnerId, UnitOfMeasure};

/// Catalog entry for a tradable commodity.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Commodity {
    pub id: CommodityId,
    pub name: String,
    pub unit: UnitOfMeasure,
    pub description: Option<String>,
}

/// Supplier or customer owned by a single caller.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Counterparty {
    pub id: CounterpartyId,
    pub owner: OwnerId,
    pub kind: CounterpartyKind,
    pub name: String,
    pub company: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Counterparty {
    /// Copy of the details a transaction keeps about its counterparty.
    pub fn snapshot(&self) -> CounterpartySnapshot {
        CounterpartySnapshot {
            name: self.name.clone(),
            company: self.company.clone(),
            phone: self.phone.clone(),
        }
    }
}

/// Counterparty details frozen into a transaction at write time.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CounterpartySnapshot {
    pub name: String,
    pub company: Option<String>,
    pub phone: Option<String>,
}

/// Fields supplied when registering a supplier or customer.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCounterparty {
    pub name: String,
    pub company: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

/// Partial update of a counterparty; only `Some` fields are written.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CounterpartyPatch {
    pub name: Option<String>,
    pub company: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

impl CounterpartyPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.company.is_none()
            && self.email.is_none()
            && self.phone.is_none()
            && self.address.is_none()
    }
}
