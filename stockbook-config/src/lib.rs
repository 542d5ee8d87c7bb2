//! Typed settings for Stockbook, layered from built-in defaults, an optional
//! TOML file and `STOCKBOOK__*` environment variables.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use config::{Config, Environment, File, FileFormat};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use stockbook_posting::{ConsistencyMode, DEFAULT_TOLERANCE};

pub const ENV_PREFIX: &str = "STOCKBOOK";
pub const ENV_SEPARATOR: &str = "__";

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StockbookConfig {
    pub database: DatabaseConfig,
    pub posting: PostingConfig,
    pub telemetry: TelemetryConfig,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: PathBuf,
    /// How long a posting waits for the write lock before failing.
    pub busy_timeout_ms: u64,
}

impl DatabaseConfig {
    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("stockbook.db"),
            busy_timeout_ms: 5_000,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Consistency {
    #[default]
    Strict,
    Trust,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PostingConfig {
    pub consistency: Consistency,
    /// Allowed gap between a supplied total and `quantity * rate` in strict mode.
    pub tolerance: Decimal,
}

impl PostingConfig {
    pub fn consistency_mode(&self) -> ConsistencyMode {
        match self.consistency {
            Consistency::Strict => ConsistencyMode::Strict {
                tolerance: self.tolerance.abs(),
            },
            Consistency::Trust => ConsistencyMode::Trust,
        }
    }
}

impl Default for PostingConfig {
    fn default() -> Self {
        Self {
            consistency: Consistency::Strict,
            tolerance: DEFAULT_TOLERANCE,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    /// Filter used when `RUST_LOG` is unset.
    pub level: String,
    pub json: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

/// Load settings from `path` (if given and present) and the process
/// environment.
pub fn load_config(path: Option<&Path>) -> Result<StockbookConfig> {
    load_config_from(path, None)
}

/// Like [`load_config`], reading environment overrides from `env` instead of
/// the process environment when it is provided.
pub fn load_config_from(
    path: Option<&Path>,
    env: Option<HashMap<String, String>>,
) -> Result<StockbookConfig> {
    let mut builder = Config::builder();
    if let Some(path) = path {
        builder = builder.add_source(
            File::from(path)
                .format(FileFormat::Toml)
                .required(false),
        );
    }
    builder = builder.add_source(
        Environment::with_prefix(ENV_PREFIX)
            .separator(ENV_SEPARATOR)
            .try_parsing(true)
            .source(env),
    );
    let settings = builder
        .build()
        .context("failed to assemble stockbook configuration")?;
    settings
        .try_deserialize::<StockbookConfig>()
        .context("invalid stockbook configuration")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn defaults_apply_without_sources() {
        let config = load_config_from(None, Some(HashMap::new())).unwrap();
        assert_eq!(config, StockbookConfig::default());
        assert_eq!(config.database.busy_timeout(), Duration::from_secs(5));
        assert_eq!(
            config.posting.consistency_mode(),
            ConsistencyMode::Strict {
                tolerance: dec!(0.01)
            }
        );
    }

    #[test]
    fn missing_file_is_not_an_error() {
        let dir = tempdir().unwrap();
        let config =
            load_config_from(Some(&dir.path().join("absent.toml")), Some(HashMap::new())).unwrap();
        assert_eq!(config.database.path, PathBuf::from("stockbook.db"));
    }

    #[test]
    fn file_then_env_override_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("stockbook.toml");
        fs::write(
            &path,
            r#"
[database]
path = "/var/lib/stockbook/book.db"
busy_timeout_ms = 250

[posting]
consistency = "trust"

[telemetry]
level = "debug"
"#,
        )
        .unwrap();

        let config = load_config_from(Some(&path), Some(HashMap::new())).unwrap();
        assert_eq!(config.database.path, PathBuf::from("/var/lib/stockbook/book.db"));
        assert_eq!(config.database.busy_timeout_ms, 250);
        assert_eq!(config.posting.consistency_mode(), ConsistencyMode::Trust);
        assert_eq!(config.telemetry.level, "debug");
        assert!(!config.telemetry.json);

        let env = HashMap::from([
            ("STOCKBOOK__DATABASE__BUSY_TIMEOUT_MS".to_string(), "900".to_string()),
            ("STOCKBOOK__TELEMETRY__JSON".to_string(), "true".to_string()),
        ]);
        let config = load_config_from(Some(&path), Some(env)).unwrap();
        assert_eq!(config.database.busy_timeout_ms, 900);
        assert!(config.telemetry.json);
        assert_eq!(config.telemetry.level, "debug");
    }
}
