use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use stockbook_core::{CommodityId, OwnerId, Price, PriceSide, UnitOfMeasure};
use tracing::debug;

use crate::sqlite::{decode_optional_decimal, decode_time, encode_decimal, encode_time};
use crate::{LedgerResult, RateQuote, RateRecord};

/// Latest purchase and sale price per (owner, commodity).
///
/// The two prices are written by separate upserts; neither reads nor clears
/// the other.
pub struct RateTracker<'c> {
    conn: &'c Connection,
    now: DateTime<Utc>,
}

impl<'c> RateTracker<'c> {
    pub fn new(conn: &'c Connection, now: DateTime<Utc>) -> Self {
        Self { conn, now }
    }

    pub fn record_purchase_price(
        &self,
        owner: &OwnerId,
        commodity: &CommodityId,
        commodity_name: &str,
        price: Price,
    ) -> LedgerResult<()> {
        self.conn.execute(
            "INSERT INTO commodity_rates (
                owner, commodity_id, commodity_name, purchase_price, sale_price, fetched_at
             ) VALUES (?1, ?2, ?3, ?4, NULL, ?5)
             ON CONFLICT(owner, commodity_id) DO UPDATE SET
                purchase_price = excluded.purchase_price,
                fetched_at = excluded.fetched_at",
            params![
                owner.as_str(),
                commodity.as_str(),
                commodity_name,
                encode_decimal(price),
                encode_time(self.now),
            ],
        )?;
        debug!(owner = %owner, commodity = %commodity, price = %price, "purchase rate recorded");
        Ok(())
    }

    pub fn record_sale_price(
        &self,
        owner: &OwnerId,
        commodity: &CommodityId,
        commodity_name: &str,
        price: Price,
    ) -> LedgerResult<()> {
        self.conn.execute(
            "INSERT INTO commodity_rates (
                owner, commodity_id, commodity_name, purchase_price, sale_price, fetched_at
             ) VALUES (?1, ?2, ?3, NULL, ?4, ?5)
             ON CONFLICT(owner, commodity_id) DO UPDATE SET
                sale_price = excluded.sale_price,
                fetched_at = excluded.fetched_at",
            params![
                owner.as_str(),
                commodity.as_str(),
                commodity_name,
                encode_decimal(price),
                encode_time(self.now),
            ],
        )?;
        debug!(owner = %owner, commodity = %commodity, price = %price, "sale rate recorded");
        Ok(())
    }

    pub fn record(
        &self,
        side: PriceSide,
        owner: &OwnerId,
        commodity: &CommodityId,
        commodity_name: &str,
        price: Price,
    ) -> LedgerResult<()> {
        match side {
            PriceSide::Purchase => {
                self.record_purchase_price(owner, commodity, commodity_name, price)
            }
            PriceSide::Sale => self.record_sale_price(owner, commodity, commodity_name, price),
        }
    }

    pub fn get(
        &self,
        owner: &OwnerId,
        commodity: &CommodityId,
    ) -> LedgerResult<Option<RateRecord>> {
        let raw = self
            .conn
            .query_row(
                "SELECT owner, commodity_id, commodity_name, purchase_price, sale_price, fetched_at
                 FROM commodity_rates WHERE owner = ?1 AND commodity_id = ?2",
                params![owner.as_str(), commodity.as_str()],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, Option<String>>(3)?,
                        row.get::<_, Option<String>>(4)?,
                        row.get::<_, String>(5)?,
                    ))
                },
            )
            .optional()?;
        let Some((owner, commodity_id, commodity_name, purchase, sale, fetched_at)) = raw else {
            return Ok(None);
        };
        Ok(Some(RateRecord {
            owner: OwnerId::from(owner),
            commodity_id: CommodityId::from(commodity_id),
            commodity_name,
            purchase_price: decode_optional_decimal(purchase)?,
            sale_price: decode_optional_decimal(sale)?,
            fetched_at: decode_time(&fetched_at)?,
        }))
    }

    /// Latest prices on one side for every commodity the owner has traded,
    /// skipping commodities with no price on that side yet.
    pub fn list(&self, owner: &OwnerId, side: PriceSide) -> LedgerResult<Vec<RateQuote>> {
        let column = match side {
            PriceSide::Purchase => "purchase_price",
            PriceSide::Sale => "sale_price",
        };
        let sql = format!(
            "SELECT r.commodity_id, r.commodity_name, c.unit, r.{column}, r.fetched_at
             FROM commodity_rates r
             LEFT JOIN commodities c ON c.id = r.commodity_id
             WHERE r.owner = ?1 AND r.{column} IS NOT NULL
             ORDER BY r.commodity_name"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params![owner.as_str()], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, Option<String>>(2)?,
                row.get::<_, Option<String>>(3)?,
                row.get::<_, String>(4)?,
            ))
        })?;
        let mut quotes = Vec::new();
        for row in rows {
            let (commodity_id, commodity_name, unit, price, fetched_at) = row?;
            let Some(price) = decode_optional_decimal(price)? else {
                continue;
            };
            quotes.push(RateQuote {
                commodity_id: CommodityId::from(commodity_id),
                commodity_name,
                unit: unit.map(UnitOfMeasure::from),
                side,
                price,
                last_updated: decode_time(&fetched_at)?,
            });
        }
        Ok(quotes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SqliteStore;
    use rust_decimal_macros::dec;
    use tempfile::tempdir;

    #[test]
    fn prices_update_independently() {
        let dir = tempdir().unwrap();
        let store = SqliteStore::new(dir.path().join("stock.db")).unwrap();
        let owner = OwnerId::from("owner-a");
        let rice = CommodityId::from("rice");

        store
            .write(|unit| unit.rates().record_sale_price(&owner, &rice, "Rice", dec!(210)))
            .unwrap();
        let first = store.rate(&owner, &rice).unwrap().unwrap();
        assert_eq!(first.sale_price, Some(dec!(210)));
        assert_eq!(first.purchase_price, None);

        store
            .write(|unit| {
                unit.rates()
                    .record_purchase_price(&owner, &rice, "Rice", dec!(180.5))
            })
            .unwrap();
        let second = store.rate(&owner, &rice).unwrap().unwrap();
        assert_eq!(second.sale_price, Some(dec!(210)));
        assert_eq!(second.purchase_price, Some(dec!(180.50)));
        assert_eq!(second.price(PriceSide::Purchase), Some(dec!(180.50)));
    }

    #[test]
    fn listing_skips_missing_side() {
        let dir = tempdir().unwrap();
        let store = SqliteStore::new(dir.path().join("stock.db")).unwrap();
        let owner = OwnerId::from("owner-a");
        store
            .write(|unit| -> LedgerResult<()> {
                let rates = unit.rates();
                rates.record_purchase_price(&owner, &CommodityId::from("a"), "Barley", dec!(90))?;
                rates.record_sale_price(&owner, &CommodityId::from("b"), "Oats", dec!(70))?;
                Ok(())
            })
            .unwrap();
        let purchases = store.rate_quotes(&owner, PriceSide::Purchase).unwrap();
        assert_eq!(purchases.len(), 1);
        assert_eq!(purchases[0].commodity_name, "Barley");
        assert_eq!(purchases[0].unit, None);
        let sales = store.rate_quotes(&owner, PriceSide::Sale).unwrap();
        assert_eq!(sales.len(), 1);
        assert_eq!(sales[0].price, dec!(70));
    }
}
