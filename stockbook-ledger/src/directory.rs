use chrono::Utc;
use rusqlite::{params, OptionalExtension};
use stockbook_core::{
    Commodity, CommodityId, Counterparty, CounterpartyId, CounterpartyKind, CounterpartyPatch,
    NewCounterparty, OwnerId, UnitOfMeasure,
};
use tracing::debug;
use uuid::Uuid;

use crate::sqlite::{decode_time, encode_time};
use crate::{CommodityCatalog, CounterpartyDirectory, LedgerError, LedgerResult, SqliteStore};

const COUNTERPARTY_COLUMNS: &str =
    "id, owner, kind, name, company, email, phone, address, created_at";

impl CommodityCatalog for SqliteStore {
    fn lookup(&self, id: &CommodityId) -> LedgerResult<Option<Commodity>> {
        self.read(|conn| {
            conn.query_row(
                "SELECT id, name, unit, description FROM commodities WHERE id = ?1",
                params![id.as_str()],
                commodity_from_row,
            )
            .optional()
            .map_err(LedgerError::from)
        })
    }
}

impl CounterpartyDirectory for SqliteStore {
    fn lookup(
        &self,
        owner: &OwnerId,
        kind: CounterpartyKind,
        id: &CounterpartyId,
    ) -> LedgerResult<Option<Counterparty>> {
        self.read(|conn| {
            let sql = format!(
                "SELECT {COUNTERPARTY_COLUMNS} FROM counterparties
                 WHERE id = ?1 AND owner = ?2 AND kind = ?3"
            );
            let raw = conn
                .query_row(
                    &sql,
                    params![id.as_str(), owner.as_str(), kind.as_str()],
                    RawCounterparty::from_row,
                )
                .optional()?;
            raw.map(RawCounterparty::decode).transpose()
        })
    }
}

impl SqliteStore {
    /// The whole commodity catalog, ordered by name.
    pub fn list_commodities(&self) -> LedgerResult<Vec<Commodity>> {
        self.read(|conn| {
            let mut stmt = conn
                .prepare("SELECT id, name, unit, description FROM commodities ORDER BY name")?;
            let rows = stmt.query_map([], commodity_from_row)?;
            let mut commodities = Vec::new();
            for row in rows {
                commodities.push(row?);
            }
            Ok(commodities)
        })
    }

    pub fn list_counterparties(
        &self,
        owner: &OwnerId,
        kind: CounterpartyKind,
    ) -> LedgerResult<Vec<Counterparty>> {
        self.read(|conn| {
            let sql = format!(
                "SELECT {COUNTERPARTY_COLUMNS} FROM counterparties
                 WHERE owner = ?1 AND kind = ?2 ORDER BY name"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows =
                stmt.query_map(params![owner.as_str(), kind.as_str()], RawCounterparty::from_row)?;
            let mut entries = Vec::new();
            for raw in rows {
                entries.push(raw?.decode()?);
            }
            Ok(entries)
        })
    }

    /// Store a new counterparty as given; callers validate fields first.
    pub fn insert_counterparty(
        &self,
        owner: &OwnerId,
        kind: CounterpartyKind,
        fields: &NewCounterparty,
    ) -> LedgerResult<Counterparty> {
        let counterparty = Counterparty {
            id: CounterpartyId::from(Uuid::new_v4().to_string()),
            owner: owner.clone(),
            kind,
            name: fields.name.trim().to_string(),
            company: fields.company.clone(),
            email: fields.email.clone(),
            phone: fields.phone.clone(),
            address: fields.address.clone(),
            created_at: Utc::now(),
        };
        self.read(|conn| {
            conn.execute(
                "INSERT INTO counterparties (
                    id, owner, kind, name, company, email, phone, address, created_at
                 ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    counterparty.id.as_str(),
                    counterparty.owner.as_str(),
                    counterparty.kind.as_str(),
                    counterparty.name,
                    counterparty.company,
                    counterparty.email,
                    counterparty.phone,
                    counterparty.address,
                    encode_time(counterparty.created_at),
                ],
            )?;
            Ok(())
        })?;
        debug!(owner = %owner, kind = %kind, id = %counterparty.id, "counterparty registered");
        Ok(counterparty)
    }

    /// Write the `Some` fields of `patch`. Returns false when no row with
    /// that id, owner and kind exists.
    pub fn apply_counterparty_patch(
        &self,
        owner: &OwnerId,
        kind: CounterpartyKind,
        id: &CounterpartyId,
        patch: &CounterpartyPatch,
    ) -> LedgerResult<bool> {
        let changed = self.read(|conn| {
            conn.execute(
                "UPDATE counterparties SET
                    name = COALESCE(?4, name),
                    company = COALESCE(?5, company),
                    email = COALESCE(?6, email),
                    phone = COALESCE(?7, phone),
                    address = COALESCE(?8, address)
                 WHERE id = ?1 AND owner = ?2 AND kind = ?3",
                params![
                    id.as_str(),
                    owner.as_str(),
                    kind.as_str(),
                    patch.name.as_deref().map(str::trim),
                    patch.company,
                    patch.email,
                    patch.phone,
                    patch.address,
                ],
            )
            .map_err(LedgerError::from)
        })?;
        Ok(changed > 0)
    }

    /// Whether another of the owner's `kind` entries already uses `email` or
    /// `phone`. `exclude` skips the row being patched.
    pub fn contact_conflict(
        &self,
        owner: &OwnerId,
        kind: CounterpartyKind,
        email: Option<&str>,
        phone: Option<&str>,
        exclude: Option<&CounterpartyId>,
    ) -> LedgerResult<bool> {
        if email.is_none() && phone.is_none() {
            return Ok(false);
        }
        self.read(|conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM counterparties
                 WHERE owner = ?1 AND kind = ?2
                   AND (?5 IS NULL OR id <> ?5)
                   AND ((?3 IS NOT NULL AND email = ?3) OR (?4 IS NOT NULL AND phone = ?4))",
                params![
                    owner.as_str(),
                    kind.as_str(),
                    email,
                    phone,
                    exclude.map(|id| id.as_str()),
                ],
                |row| row.get(0),
            )?;
            Ok(count > 0)
        })
    }
}

fn commodity_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Commodity> {
    Ok(Commodity {
        id: CommodityId::from(row.get::<_, String>(0)?),
        name: row.get(1)?,
        unit: UnitOfMeasure::from(row.get::<_, String>(2)?),
        description: row.get(3)?,
    })
}

struct RawCounterparty {
    id: String,
    owner: String,
    kind: String,
    name: String,
    company: Option<String>,
    email: Option<String>,
    phone: Option<String>,
    address: Option<String>,
    created_at: String,
}

impl RawCounterparty {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            owner: row.get(1)?,
            kind: row.get(2)?,
            name: row.get(3)?,
            company: row.get(4)?,
            email: row.get(5)?,
            phone: row.get(6)?,
            address: row.get(7)?,
            created_at: row.get(8)?,
        })
    }

    fn decode(self) -> LedgerResult<Counterparty> {
        let kind = self
            .kind
            .parse::<CounterpartyKind>()
            .map_err(LedgerError::Serialization)?;
        Ok(Counterparty {
            id: CounterpartyId::from(self.id),
            owner: OwnerId::from(self.owner),
            kind,
            name: self.name,
            company: self.company,
            email: self.email,
            phone: self.phone,
            address: self.address,
            created_at: decode_time(&self.created_at)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn supplier(name: &str, phone: &str) -> NewCounterparty {
        NewCounterparty {
            name: name.into(),
            phone: Some(phone.into()),
            ..Default::default()
        }
    }

    #[test]
    fn lookup_is_scoped_to_owner_and_kind() {
        let dir = tempdir().unwrap();
        let store = SqliteStore::new(dir.path().join("stock.db")).unwrap();
        let owner = OwnerId::from("owner-a");
        let created = store
            .insert_counterparty(
                &owner,
                CounterpartyKind::Supplier,
                &supplier("Ali", "0300-1234567"),
            )
            .unwrap();

        let found = CounterpartyDirectory::lookup(
            &store,
            &owner,
            CounterpartyKind::Supplier,
            &created.id,
        )
        .unwrap();
        assert_eq!(found.as_ref().map(|c| c.name.as_str()), Some("Ali"));

        let as_customer =
            CounterpartyDirectory::lookup(&store, &owner, CounterpartyKind::Customer, &created.id)
                .unwrap();
        assert!(as_customer.is_none());

        let other_owner = CounterpartyDirectory::lookup(
            &store,
            &OwnerId::from("owner-b"),
            CounterpartyKind::Supplier,
            &created.id,
        )
        .unwrap();
        assert!(other_owner.is_none());
    }

    #[test]
    fn patch_touches_only_given_fields() {
        let dir = tempdir().unwrap();
        let store = SqliteStore::new(dir.path().join("stock.db")).unwrap();
        let owner = OwnerId::from("owner-a");
        let created = store
            .insert_counterparty(
                &owner,
                CounterpartyKind::Customer,
                &supplier("Bilal", "0321-7654321"),
            )
            .unwrap();
        let patch = CounterpartyPatch {
            company: Some("Bilal Mills".into()),
            ..Default::default()
        };
        assert!(store
            .apply_counterparty_patch(&owner, CounterpartyKind::Customer, &created.id, &patch)
            .unwrap());
        let loaded =
            CounterpartyDirectory::lookup(&store, &owner, CounterpartyKind::Customer, &created.id)
                .unwrap()
                .unwrap();
        assert_eq!(loaded.name, "Bilal");
        assert_eq!(loaded.company.as_deref(), Some("Bilal Mills"));
        assert_eq!(loaded.phone.as_deref(), Some("0321-7654321"));

        let missing = store
            .apply_counterparty_patch(
                &OwnerId::from("owner-b"),
                CounterpartyKind::Customer,
                &created.id,
                &patch,
            )
            .unwrap();
        assert!(!missing);
    }

    #[test]
    fn contact_conflict_ignores_excluded_row() {
        let dir = tempdir().unwrap();
        let store = SqliteStore::new(dir.path().join("stock.db")).unwrap();
        let owner = OwnerId::from("owner-a");
        let kind = CounterpartyKind::Supplier;
        let created = store
            .insert_counterparty(&owner, kind, &supplier("Ali", "0300-1234567"))
            .unwrap();

        assert!(store
            .contact_conflict(&owner, kind, None, Some("0300-1234567"), None)
            .unwrap());
        assert!(!store
            .contact_conflict(&owner, kind, None, Some("0300-1234567"), Some(&created.id))
            .unwrap());
        assert!(!store
            .contact_conflict(&OwnerId::from("owner-b"), kind, None, Some("0300-1234567"), None)
            .unwrap());
        assert!(!store.contact_conflict(&owner, kind, None, None, None).unwrap());
    }
}
