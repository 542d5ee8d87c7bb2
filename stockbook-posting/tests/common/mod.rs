#![allow(dead_code)]

use anyhow::Result;
use rust_decimal::Decimal;
use stockbook_core::{CommodityId, Counterparty, CounterpartyKind, NewCounterparty, OwnerId};
use stockbook_ledger::{SeedCommodity, SqliteStore};
use stockbook_posting::{register_counterparty, PostingRequest, TransactionPoster};
use tempfile::TempDir;

/// Throwaway store seeded with two commodities and one supplier and
/// customer for a single owner.
pub struct Desk {
    pub dir: TempDir,
    pub poster: TransactionPoster,
    pub owner: OwnerId,
    pub wheat: CommodityId,
    pub milk: CommodityId,
    pub supplier: Counterparty,
    pub customer: Counterparty,
}

impl Desk {
    pub fn open() -> Result<Self> {
        let dir = tempfile::tempdir()?;
        let store = SqliteStore::new(dir.path().join("stockbook.db"))?;
        store.bootstrap(&[
            SeedCommodity::new("Wheat", "kg"),
            SeedCommodity::new("Milk", "litre"),
        ])?;
        let catalog = store.list_commodities()?;
        let id_of = |name: &str| {
            catalog
                .iter()
                .find(|commodity| commodity.name == name)
                .map(|commodity| commodity.id.clone())
                .ok_or_else(|| anyhow::anyhow!("{name} missing from catalog"))
        };
        let wheat = id_of("Wheat")?;
        let milk = id_of("Milk")?;
        let owner = OwnerId::from("owner-a");
        let supplier = register(&store, &owner, CounterpartyKind::Supplier, "Ali Traders")?;
        let customer = register(&store, &owner, CounterpartyKind::Customer, "Bilal Store")?;
        Ok(Self {
            dir,
            poster: TransactionPoster::new(store),
            owner,
            wheat,
            milk,
            supplier,
            customer,
        })
    }

    pub fn store(&self) -> &SqliteStore {
        self.poster.store()
    }

    pub fn purchase(
        &self,
        commodity: &CommodityId,
        quantity: Decimal,
        rate: Decimal,
    ) -> PostingRequest {
        PostingRequest::new(commodity.clone(), self.supplier.id.clone())
            .with_quantity(quantity)
            .with_rate(rate)
    }

    pub fn sale(
        &self,
        commodity: &CommodityId,
        quantity: Decimal,
        rate: Decimal,
    ) -> PostingRequest {
        PostingRequest::new(commodity.clone(), self.customer.id.clone())
            .with_quantity(quantity)
            .with_rate(rate)
    }

    pub fn balance(&self, commodity: &CommodityId) -> Result<Option<Decimal>> {
        Ok(self
            .store()
            .inventory_balance(&self.owner, commodity)?
            .map(|record| record.balance))
    }
}

pub fn register(
    store: &SqliteStore,
    owner: &OwnerId,
    kind: CounterpartyKind,
    name: &str,
) -> Result<Counterparty> {
    Ok(register_counterparty(
        store,
        Some(owner),
        kind,
        NewCounterparty {
            name: name.into(),
            ..Default::default()
        },
    )?)
}
