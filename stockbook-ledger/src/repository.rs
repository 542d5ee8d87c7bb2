use stockbook_core::{
    Commodity, CommodityId, Counterparty, CounterpartyId, CounterpartyKind, OwnerId,
};

use crate::LedgerResult;

/// Read-only lookup of commodity attributes by id.
pub trait CommodityCatalog: Send + Sync {
    fn lookup(&self, id: &CommodityId) -> LedgerResult<Option<Commodity>>;
}

/// Read-only lookup of an owner's suppliers and customers.
pub trait CounterpartyDirectory: Send + Sync {
    /// Resolve `id` only if it is a `kind` entry owned by `owner`.
    fn lookup(
        &self,
        owner: &OwnerId,
        kind: CounterpartyKind,
        id: &CounterpartyId,
    ) -> LedgerResult<Option<Counterparty>>;
}
