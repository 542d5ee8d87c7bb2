use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use rust_decimal::Decimal;
use stockbook_core::{CommodityId, OwnerId, Quantity, UnitOfMeasure};
use tracing::debug;

use crate::sqlite::{decode_decimal, decode_time, encode_decimal, encode_time};
use crate::{InventoryRecord, LedgerError, LedgerResult};

const INVENTORY_COLUMNS: &str =
    "owner, commodity_id, commodity_name, unit, purchased, sold, balance, updated_at";

/// Running stock balances, one row per (owner, commodity).
///
/// Borrows whatever connection it is given; inside a [`crate::WriteUnit`]
/// every call joins the posting's transaction.
pub struct InventoryLedger<'c> {
    conn: &'c Connection,
    now: DateTime<Utc>,
}

impl<'c> InventoryLedger<'c> {
    pub fn new(conn: &'c Connection, now: DateTime<Utc>) -> Self {
        Self { conn, now }
    }

    pub fn get_balance(
        &self,
        owner: &OwnerId,
        commodity: &CommodityId,
    ) -> LedgerResult<Option<InventoryRecord>> {
        let sql = format!(
            "SELECT {INVENTORY_COLUMNS} FROM inventory WHERE owner = ?1 AND commodity_id = ?2"
        );
        let raw = self
            .conn
            .query_row(&sql, params![owner.as_str(), commodity.as_str()], RawInventory::from_row)
            .optional()?;
        raw.map(RawInventory::decode).transpose()
    }

    /// All of an owner's balances, ordered by commodity name.
    pub fn list(&self, owner: &OwnerId) -> LedgerResult<Vec<InventoryRecord>> {
        let sql = format!(
            "SELECT {INVENTORY_COLUMNS} FROM inventory WHERE owner = ?1 ORDER BY commodity_name"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params![owner.as_str()], RawInventory::from_row)?;
        let mut records = Vec::new();
        for raw in rows {
            records.push(raw?.decode()?);
        }
        Ok(records)
    }

    /// Add `quantity` to the purchased total and the balance, creating the
    /// row on the owner's first purchase of the commodity.
    pub fn apply_purchase(
        &self,
        owner: &OwnerId,
        commodity: &CommodityId,
        commodity_name: &str,
        unit: &UnitOfMeasure,
        quantity: Quantity,
    ) -> LedgerResult<InventoryRecord> {
        let record = match self.get_balance(owner, commodity)? {
            Some(mut existing) => {
                existing.purchased = checked_total(existing.purchased.checked_add(quantity))?;
                existing.balance = checked_total(existing.balance.checked_add(quantity))?;
                existing.updated_at = self.now;
                self.update(&existing)?;
                existing
            }
            None => {
                let created = InventoryRecord {
                    owner: owner.clone(),
                    commodity_id: commodity.clone(),
                    commodity_name: commodity_name.to_string(),
                    unit: unit.clone(),
                    purchased: quantity,
                    sold: Decimal::ZERO,
                    balance: quantity,
                    updated_at: self.now,
                };
                self.insert(&created)?;
                created
            }
        };
        debug!(
            owner = %owner,
            commodity = %commodity,
            quantity = %quantity,
            balance = %record.balance,
            "inventory purchase applied"
        );
        Ok(record)
    }

    /// Add `quantity` to the sold total and remove it from the balance.
    ///
    /// Does not check the balance; the caller confirms availability against
    /// a read taken in the same unit.
    pub fn apply_sale(
        &self,
        owner: &OwnerId,
        commodity: &CommodityId,
        quantity: Quantity,
    ) -> LedgerResult<InventoryRecord> {
        let mut record = self.get_balance(owner, commodity)?.ok_or_else(|| {
            LedgerError::InvalidState(format!(
                "no inventory row for owner {owner} and commodity {commodity}"
            ))
        })?;
        record.sold = checked_total(record.sold.checked_add(quantity))?;
        record.balance = checked_total(record.balance.checked_sub(quantity))?;
        record.updated_at = self.now;
        self.update(&record)?;
        debug!(
            owner = %owner,
            commodity = %commodity,
            quantity = %quantity,
            balance = %record.balance,
            "inventory sale applied"
        );
        Ok(record)
    }

    fn insert(&self, record: &InventoryRecord) -> LedgerResult<()> {
        self.conn.execute(
            "INSERT INTO inventory (
                owner, commodity_id, commodity_name, unit, purchased, sold, balance, updated_at
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                record.owner.as_str(),
                record.commodity_id.as_str(),
                record.commodity_name,
                record.unit.as_str(),
                encode_decimal(record.purchased),
                encode_decimal(record.sold),
                encode_decimal(record.balance),
                encode_time(record.updated_at),
            ],
        )?;
        Ok(())
    }

    fn update(&self, record: &InventoryRecord) -> LedgerResult<()> {
        self.conn.execute(
            "UPDATE inventory
             SET purchased = ?3, sold = ?4, balance = ?5, updated_at = ?6
             WHERE owner = ?1 AND commodity_id = ?2",
            params![
                record.owner.as_str(),
                record.commodity_id.as_str(),
                encode_decimal(record.purchased),
                encode_decimal(record.sold),
                encode_decimal(record.balance),
                encode_time(record.updated_at),
            ],
        )?;
        Ok(())
    }
}

fn checked_total(value: Option<Decimal>) -> LedgerResult<Decimal> {
    value.ok_or_else(|| LedgerError::InvalidState("inventory total overflowed".into()))
}

struct RawInventory {
    owner: String,
    commodity_id: String,
    commodity_name: String,
    unit: String,
    purchased: String,
    sold: String,
    balance: String,
    updated_at: String,
}

impl RawInventory {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            owner: row.get(0)?,
            commodity_id: row.get(1)?,
            commodity_name: row.get(2)?,
            unit: row.get(3)?,
            purchased: row.get(4)?,
            sold: row.get(5)?,
            balance: row.get(6)?,
            updated_at: row.get(7)?,
        })
    }

    fn decode(self) -> LedgerResult<InventoryRecord> {
        Ok(InventoryRecord {
            owner: OwnerId::from(self.owner),
            commodity_id: CommodityId::from(self.commodity_id),
            commodity_name: self.commodity_name,
            unit: UnitOfMeasure::from(self.unit),
            purchased: decode_decimal(&self.purchased)?,
            sold: decode_decimal(&self.sold)?,
            balance: decode_decimal(&self.balance)?,
            updated_at: decode_time(&self.updated_at)?,
        })
    }
}
