use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, TransactionBehavior};
use rust_decimal::Decimal;
use stockbook_core::{
    round_money, CommodityId, CounterpartyId, CounterpartySnapshot, OwnerId, PriceSide,
    TransactionKind, UnitOfMeasure,
};
use uuid::Uuid;

use crate::{
    InventoryLedger, InventoryRecord, LedgerError, LedgerResult, RateQuote, RateRecord,
    RateTracker, TransactionPage, TransactionQuery, TransactionRecord,
};

pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const STOCKBOOK_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS commodities (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL UNIQUE,
    unit TEXT NOT NULL,
    description TEXT,
    created_at TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS counterparties (
    id TEXT PRIMARY KEY,
    owner TEXT NOT NULL,
    kind TEXT NOT NULL CHECK (kind IN ('supplier', 'customer')),
    name TEXT NOT NULL,
    company TEXT,
    email TEXT,
    phone TEXT,
    address TEXT,
    created_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS counterparties_idx_owner_kind
    ON counterparties(owner, kind);
CREATE TABLE IF NOT EXISTS transactions (
    id TEXT PRIMARY KEY,
    owner TEXT NOT NULL,
    kind TEXT NOT NULL CHECK (kind IN ('purchase', 'sale')),
    commodity_id TEXT NOT NULL,
    commodity_name TEXT NOT NULL,
    unit TEXT NOT NULL,
    quantity TEXT NOT NULL,
    rate TEXT NOT NULL,
    total TEXT NOT NULL,
    secondary_quantity TEXT,
    supplier_id TEXT,
    customer_id TEXT,
    counterparty_name TEXT NOT NULL,
    counterparty_company TEXT,
    counterparty_phone TEXT,
    note TEXT,
    event_time TEXT NOT NULL,
    created_at TEXT NOT NULL,
    CHECK (
        (kind = 'purchase' AND supplier_id IS NOT NULL AND customer_id IS NULL)
        OR (kind = 'sale' AND customer_id IS NOT NULL AND supplier_id IS NULL)
    )
);
CREATE INDEX IF NOT EXISTS transactions_idx_owner_kind_created
    ON transactions(owner, kind, created_at);
CREATE TABLE IF NOT EXISTS inventory (
    owner TEXT NOT NULL,
    commodity_id TEXT NOT NULL,
    commodity_name TEXT NOT NULL,
    unit TEXT NOT NULL,
    purchased TEXT NOT NULL,
    sold TEXT NOT NULL,
    balance TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    PRIMARY KEY (owner, commodity_id)
);
CREATE TABLE IF NOT EXISTS commodity_rates (
    owner TEXT NOT NULL,
    commodity_id TEXT NOT NULL,
    commodity_name TEXT NOT NULL,
    purchase_price TEXT,
    sale_price TEXT,
    fetched_at TEXT NOT NULL,
    PRIMARY KEY (owner, commodity_id)
);
"#;

const TRANSACTION_COLUMNS: &str = "id, owner, kind, commodity_id, commodity_name, unit, \
    quantity, rate, total, secondary_quantity, supplier_id, customer_id, counterparty_name, \
    counterparty_company, counterparty_phone, note, event_time, created_at";

const TRANSACTION_FILTER: &str = r#"
WHERE owner = ?1
  AND (?2 IS NULL OR kind = ?2)
  AND (?3 IS NULL OR commodity_id = ?3)
  AND (?4 IS NULL OR event_time >= ?4)
  AND (?5 IS NULL OR event_time <= ?5)
  AND (?6 IS NULL
       OR commodity_name LIKE ?6 ESCAPE '\'
       OR counterparty_name LIKE ?6 ESCAPE '\'
       OR substr(event_time, 1, 10) LIKE ?6 ESCAPE '\')"#;

/// SQLite database holding the transaction log, the derived inventory and
/// rate tables, and the master data they reference.
///
/// Every call opens its own connection, so a store can be cloned freely
/// across threads.
#[derive(Clone, Debug)]
pub struct SqliteStore {
    path: PathBuf,
    busy_timeout: Duration,
}

impl SqliteStore {
    pub fn new(path: impl Into<PathBuf>) -> LedgerResult<Self> {
        Self::with_busy_timeout(path, DEFAULT_BUSY_TIMEOUT)
    }

    /// Open a store whose writers wait up to `busy_timeout` for the write lock.
    pub fn with_busy_timeout(
        path: impl Into<PathBuf>,
        busy_timeout: Duration,
    ) -> LedgerResult<Self> {
        let store = Self {
            path: path.into(),
            busy_timeout,
        };
        store.initialize_schema()?;
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub(crate) fn initialize_schema(&self) -> LedgerResult<()> {
        let conn = self.connect()?;
        conn.execute_batch(STOCKBOOK_SCHEMA)?;
        Ok(())
    }

    fn connect(&self) -> LedgerResult<Connection> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(&self.path)?;
        conn.busy_timeout(self.busy_timeout)?;
        conn.execute_batch("PRAGMA journal_mode = WAL; PRAGMA synchronous = NORMAL;")?;
        Ok(conn)
    }

    /// Run `f` inside one `BEGIN IMMEDIATE` transaction.
    ///
    /// The write lock is taken before `f` reads anything, so reads made
    /// through the unit cannot go stale before the commit. The unit commits
    /// only when `f` returns `Ok`; any error or panic rolls everything back.
    pub fn write<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&WriteUnit<'_>) -> Result<T, E>,
        E: From<LedgerError>,
    {
        let mut conn = self.connect()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(LedgerError::from)?;
        let unit = WriteUnit {
            tx,
            now: Utc::now().trunc_subsecs(6),
        };
        let value = f(&unit)?;
        unit.tx.commit().map_err(LedgerError::from)?;
        Ok(value)
    }

    /// Run a read-only closure on a fresh connection.
    pub fn read<T, F>(&self, f: F) -> LedgerResult<T>
    where
        F: FnOnce(&Connection) -> LedgerResult<T>,
    {
        let conn = self.connect()?;
        f(&conn)
    }

    pub fn inventory_balance(
        &self,
        owner: &OwnerId,
        commodity: &CommodityId,
    ) -> LedgerResult<Option<InventoryRecord>> {
        self.read(|conn| InventoryLedger::new(conn, Utc::now()).get_balance(owner, commodity))
    }

    pub fn inventory(&self, owner: &OwnerId) -> LedgerResult<Vec<InventoryRecord>> {
        self.read(|conn| InventoryLedger::new(conn, Utc::now()).list(owner))
    }

    pub fn rate(
        &self,
        owner: &OwnerId,
        commodity: &CommodityId,
    ) -> LedgerResult<Option<RateRecord>> {
        self.read(|conn| RateTracker::new(conn, Utc::now()).get(owner, commodity))
    }

    pub fn rate_quotes(&self, owner: &OwnerId, side: PriceSide) -> LedgerResult<Vec<RateQuote>> {
        self.read(|conn| RateTracker::new(conn, Utc::now()).list(owner, side))
    }

    pub fn list_transactions(
        &self,
        owner: &OwnerId,
        query: &TransactionQuery,
    ) -> LedgerResult<TransactionPage> {
        let conn = self.connect()?;
        let mut filter: Vec<Value> = Vec::with_capacity(8);
        filter.push(Value::from(owner.to_string()));
        filter.push(optional_text(query.kind.map(|kind| kind.as_str().to_string())));
        filter.push(optional_text(query.commodity.as_ref().map(|id| id.to_string())));
        let range = query.time_range();
        filter.push(optional_text(range.map(|(start, _)| encode_time(start))));
        filter.push(optional_text(range.map(|(_, end)| encode_time(end))));
        filter.push(optional_text(query.search_term().map(like_pattern)));

        let count_sql = format!("SELECT COUNT(*) FROM transactions {TRANSACTION_FILTER}");
        let total: i64 = conn.query_row(&count_sql, params_from_iter(filter.iter()), |row| {
            row.get(0)
        })?;

        let select_sql = format!(
            "SELECT {TRANSACTION_COLUMNS} FROM transactions {TRANSACTION_FILTER}
             ORDER BY created_at DESC, rowid DESC
             LIMIT ?7 OFFSET ?8"
        );
        let mut params = filter;
        params.push(Value::Integer(query.effective_limit() as i64));
        params.push(Value::Integer(query.offset() as i64));

        let mut stmt = conn.prepare(&select_sql)?;
        let mut rows = stmt.query(params_from_iter(params.iter()))?;
        let mut records = Vec::new();
        while let Some(row) = rows.next()? {
            records.push(row_to_transaction(row)?);
        }
        Ok(TransactionPage::new(records, query, total.max(0) as u64))
    }

    /// Load a single transaction belonging to `owner`.
    pub fn transaction(
        &self,
        owner: &OwnerId,
        id: Uuid,
    ) -> LedgerResult<Option<TransactionRecord>> {
        let conn = self.connect()?;
        let sql =
            format!("SELECT {TRANSACTION_COLUMNS} FROM transactions WHERE id = ?1 AND owner = ?2");
        let mut stmt = conn.prepare(&sql)?;
        let mut rows = stmt.query(params![id.to_string(), owner.as_str()])?;
        match rows.next()? {
            Some(row) => Ok(Some(row_to_transaction(row)?)),
            None => Ok(None),
        }
    }
}

/// Open store transaction shared by every step of one posting.
pub struct WriteUnit<'c> {
    tx: rusqlite::Transaction<'c>,
    now: DateTime<Utc>,
}

impl WriteUnit<'_> {
    /// Timestamp every row written by this unit carries.
    pub fn now(&self) -> DateTime<Utc> {
        self.now
    }

    pub fn inventory(&self) -> InventoryLedger<'_> {
        InventoryLedger::new(&self.tx, self.now)
    }

    pub fn rates(&self) -> RateTracker<'_> {
        RateTracker::new(&self.tx, self.now)
    }

    pub(crate) fn connection(&self) -> &rusqlite::Connection {
        &self.tx
    }

    /// Append a transaction record to the log.
    pub fn append(&self, record: &TransactionRecord) -> LedgerResult<()> {
        self.tx.execute(
            "INSERT INTO transactions (
                id, owner, kind, commodity_id, commodity_name, unit, quantity, rate, total,
                secondary_quantity, supplier_id, customer_id, counterparty_name,
                counterparty_company, counterparty_phone, note, event_time, created_at
             ) VALUES (
                ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18
             )",
            params![
                record.id.to_string(),
                record.owner.as_str(),
                record.kind.as_str(),
                record.commodity_id.as_str(),
                record.commodity_name,
                record.unit.as_str(),
                encode_decimal(record.quantity),
                encode_decimal(record.rate),
                encode_decimal(record.total),
                record.secondary_quantity.map(encode_decimal),
                record.supplier_id().map(|id| id.as_str()),
                record.customer_id().map(|id| id.as_str()),
                record.counterparty.name,
                record.counterparty.company,
                record.counterparty.phone,
                record.note,
                encode_time(record.event_time),
                encode_time(record.created_at),
            ],
        )?;
        Ok(())
    }
}

pub(crate) fn optional_text(value: Option<String>) -> Value {
    value.map(Value::from).unwrap_or(Value::Null)
}

fn like_pattern(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for ch in term.chars() {
        if matches!(ch, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped.push('%');
    escaped
}

/// Fixed-width UTC text so lexical order matches time order.
pub(crate) fn encode_time(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn decode_time(raw: &str) -> LedgerResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|err| LedgerError::Serialization(format!("invalid timestamp {raw}: {err}")))
}

pub(crate) fn encode_decimal(value: Decimal) -> String {
    round_money(value).to_string()
}

pub(crate) fn decode_decimal(raw: &str) -> LedgerResult<Decimal> {
    Decimal::from_str(raw)
        .map_err(|err| LedgerError::Serialization(format!("invalid decimal {raw}: {err}")))
}

pub(crate) fn decode_optional_decimal(raw: Option<String>) -> LedgerResult<Option<Decimal>> {
    raw.as_deref().map(decode_decimal).transpose()
}

fn row_to_transaction(row: &rusqlite::Row<'_>) -> LedgerResult<TransactionRecord> {
    let id_str: String = row.get(0)?;
    let owner: String = row.get(1)?;
    let kind_str: String = row.get(2)?;
    let commodity_id: String = row.get(3)?;
    let commodity_name: String = row.get(4)?;
    let unit: String = row.get(5)?;
    let quantity: String = row.get(6)?;
    let rate: String = row.get(7)?;
    let total: String = row.get(8)?;
    let secondary: Option<String> = row.get(9)?;
    let supplier_id: Option<String> = row.get(10)?;
    let customer_id: Option<String> = row.get(11)?;
    let counterparty_name: String = row.get(12)?;
    let counterparty_company: Option<String> = row.get(13)?;
    let counterparty_phone: Option<String> = row.get(14)?;
    let note: Option<String> = row.get(15)?;
    let event_time: String = row.get(16)?;
    let created_at: String = row.get(17)?;

    let kind = TransactionKind::from_str(&kind_str).map_err(LedgerError::Serialization)?;
    let counterparty_id = match kind {
        TransactionKind::Purchase => supplier_id,
        TransactionKind::Sale => customer_id,
    }
    .ok_or_else(|| {
        LedgerError::Serialization(format!(
            "transaction {id_str} has no {} reference",
            kind.counterparty_kind()
        ))
    })?;

    Ok(TransactionRecord {
        id: Uuid::parse_str(&id_str).map_err(|err| {
            LedgerError::Serialization(format!("invalid transaction id {id_str}: {err}"))
        })?,
        owner: OwnerId::from(owner),
        kind,
        commodity_id: CommodityId::from(commodity_id),
        commodity_name,
        unit: UnitOfMeasure::from(unit),
        quantity: decode_decimal(&quantity)?,
        rate: decode_decimal(&rate)?,
        total: decode_decimal(&total)?,
        secondary_quantity: decode_optional_decimal(secondary)?,
        counterparty_id: CounterpartyId::from(counterparty_id),
        counterparty: CounterpartySnapshot {
            name: counterparty_name,
            company: counterparty_company,
            phone: counterparty_phone,
        },
        note,
        event_time: decode_time(&event_time)?,
        created_at: decode_time(&created_at)?,
    })
}
