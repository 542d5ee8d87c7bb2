//! Persistence for Stockbook: the append-only transaction log, derived
//! inventory balances and latest rates, plus the master data postings read.

mod directory;
mod error;
mod inventory;
mod journal;
mod query;
mod rates;
mod record;
mod repository;
mod seed;
mod sqlite;

pub use error::{LedgerError, LedgerResult};
pub use inventory::InventoryLedger;
pub use journal::{record_from_posting, PostingContext};
pub use query::{TransactionPage, TransactionQuery, DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT};
pub use rates::RateTracker;
pub use record::{InventoryRecord, RateQuote, RateRecord, TransactionRecord};
pub use repository::{CommodityCatalog, CounterpartyDirectory};
pub use seed::{default_commodities, SeedCommodity};
pub use sqlite::{SqliteStore, WriteUnit, DEFAULT_BUSY_TIMEOUT};
