use chrono::Utc;
use rusqlite::params;
use tracing::info;
use uuid::Uuid;

use crate::sqlite::encode_time;
use crate::{LedgerResult, SqliteStore};

/// Catalog entry inserted by [`SqliteStore::bootstrap`] when missing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SeedCommodity {
    pub name: String,
    pub unit: String,
    pub description: Option<String>,
}

impl SeedCommodity {
    pub fn new(name: impl Into<String>, unit: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            unit: unit.into(),
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

const DEFAULT_COMMODITIES: &[(&str, &str, &str)] = &[
    ("Wheat", "kg", "Whole wheat grain"),
    ("Flour", "kg", "Wheat flour (atta)"),
    ("Gram Flour", "kg", "Besan"),
    ("Rice", "kg", "Milled rice"),
    ("Sugar", "kg", "Refined sugar"),
    ("Cotton Seed", "kg", "Banola"),
    ("Mustard Seed", "kg", "Sarson"),
    ("Sunflower Seed", "kg", "Oilseed"),
    ("Lentil (Masoor)", "kg", "Red lentil"),
    ("Chickpeas (Desi)", "kg", "Kala chana"),
    ("Mung Bean", "kg", "Green gram"),
    ("Maize (Corn)", "kg", "Makai"),
    ("Barley", "kg", "Jau"),
    ("Oats", "kg", "Whole oats"),
    ("Fodder (Green Feed)", "kg", "Green livestock feed"),
    ("Sugarcane", "kg", "Ganna"),
    ("Cattle Feed", "kg", "Wanda"),
    ("Poultry Feed", "kg", "Compound poultry feed"),
    ("Milk", "litre", "Fresh milk"),
];

/// Commodity catalog a fresh store starts with.
pub fn default_commodities() -> Vec<SeedCommodity> {
    DEFAULT_COMMODITIES
        .iter()
        .map(|(name, unit, description)| {
            SeedCommodity::new(*name, *unit).with_description(*description)
        })
        .collect()
}

impl SqliteStore {
    /// Create the schema if needed and insert every seed commodity whose
    /// name is not already in the catalog. Returns how many were inserted.
    pub fn bootstrap(&self, seed: &[SeedCommodity]) -> LedgerResult<usize> {
        self.initialize_schema()?;
        let inserted = self.write(|unit| -> LedgerResult<usize> {
            let mut inserted = 0;
            for commodity in seed {
                inserted += unit.connection().execute(
                    "INSERT OR IGNORE INTO commodities (id, name, unit, description, created_at)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                    params![
                        Uuid::new_v4().to_string(),
                        commodity.name,
                        commodity.unit,
                        commodity.description,
                        encode_time(Utc::now()),
                    ],
                )?;
            }
            Ok(inserted)
        })?;
        info!(inserted, catalog = seed.len(), path = %self.path().display(), "store bootstrapped");
        Ok(inserted)
    }
}
