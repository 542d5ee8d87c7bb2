//! Core domain types shared by every Stockbook crate.

pub mod ids;
pub mod kind;
pub mod master;
pub mod money;
pub mod unit;

pub use ids::{CommodityId, CounterpartyId, OwnerId};
pub use kind::{CounterpartyKind, PriceSide, TransactionKind};
pub use master::{
    Commodity, Counterparty, CounterpartyPatch, CounterpartySnapshot, NewCounterparty,
};
pub use money::{round_money, Amount, PostingAmounts, Price, Quantity, MONEY_SCALE};
pub use unit::{UnitOfMeasure, BUNDLE_SIZE};
