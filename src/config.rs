//! Configuration management for the lending ledger

use std::env;
use std::path::PathBuf;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    /// Path of the JSON store file. `None` keeps the store in memory only.
    pub path: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PolicyConfig {
    /// Days since `start_date` after which an unreturned loan counts as
    /// overdue.
    pub overdue_threshold_days: i64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LedgerConfig {
    /// Namespace prefix for every persisted key (`<namespace>:assets`, ...).
    pub namespace: String,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub policy: PolicyConfig,
}

impl LedgerConfig {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let config = Config::builder()
            .set_default("namespace", "lendledger")?
            .set_default("policy.overdue_threshold_days", 14_i64)?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            .add_source(
                Environment::with_prefix("LENDLEDGER")
                    .separator("_")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            namespace: "lendledger".to_string(),
            storage: StorageConfig::default(),
            policy: PolicyConfig::default(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self { path: None }
    }
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            overdue_threshold_days: 14,
        }
    }
}
