//! # Configuration State
//!
//! Stores service configuration loaded at startup.
//!
//! ## Configuration Sources (lowest to highest priority)
//! 1. Defaults (this file)
//! 2. Config file (`till.toml`, default location from `ProjectDirs`)
//! 3. Environment variables (`TILL_*`)
//!
//! After merging, [`ConfigState::validate`] rejects values the service
//! can't run with.
//!
//! ## Example `till.toml`
//! ```toml
//! [store]
//! name = "Corner Shop"
//! currency_symbol = "$"
//!
//! [database]
//! path = "/var/lib/till/till.db"
//!
//! [stock]
//! decrement_on_sale = true
//!
//! [sales]
//! offline_fallback = true
//!
//! [reports]
//! top_products_limit = 10
//! ```
//!
//! ## Thread Safety
//! Configuration is read-only after initialization, so no mutex needed.

use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use till_core::DEFAULT_TOP_PRODUCTS_LIMIT;
use tracing::{debug, info};

/// File name looked up in the platform config directory.
pub const CONFIG_FILE_NAME: &str = "till.toml";

/// Database file name in the platform data directory.
pub const DATABASE_FILE_NAME: &str = "till.db";

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid TOML in {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("environment variable {key} has invalid value '{value}'")]
    InvalidEnv { key: String, value: String },

    #[error("invalid configuration: {0}")]
    Invalid(String),

    #[error("could not determine the platform data directory")]
    NoDataDir,
}

/// Service configuration.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", default)]
pub struct ConfigState {
    pub store: StoreConfig,
    pub database: DatabaseConfig,
    pub stock: StockConfig,
    pub sales: SalesConfig,
    pub reports: ReportsConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Store name (printed in the status summary)
    pub name: String,

    /// Currency symbol (for display)
    pub currency_symbol: String,

    /// Number of decimal places for currency
    pub currency_decimals: u8,
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig {
            name: "Till POS".to_string(),
            currency_symbol: "$".to_string(),
            currency_decimals: 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// SQLite file. `None` means the platform data directory.
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StockConfig {
    /// Take sold quantities out of stock when a sale commits.
    pub decrement_on_sale: bool,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SalesConfig {
    /// Keep a sale in memory when the store fails instead of rejecting it.
    pub offline_fallback: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportsConfig {
    pub top_products_limit: u32,
}

impl Default for ReportsConfig {
    fn default() -> Self {
        ReportsConfig {
            top_products_limit: DEFAULT_TOP_PRODUCTS_LIMIT,
        }
    }
}

impl ConfigState {
    /// Loads defaults, then the TOML file, then `TILL_*` variables.
    ///
    /// ## Arguments
    /// * `path` - Explicit config file. When `None`, the platform config
    ///   directory is tried; a missing default file is not an error.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => ConfigState::from_file(path)?,
            None => match default_config_path() {
                Some(path) if path.exists() => ConfigState::from_file(&path)?,
                _ => {
                    debug!("No config file, using defaults");
                    ConfigState::default()
                }
            },
        };

        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;

        info!(
            store = %config.store.name,
            decrement_on_sale = config.stock.decrement_on_sale,
            offline_fallback = config.sales.offline_fallback,
            "Configuration loaded"
        );
        Ok(config)
    }

    /// Parses a TOML file over the defaults.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let config = ConfigState::from_toml(&raw).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })?;
        debug!(path = %path.display(), "Config file read");
        Ok(config)
    }

    pub fn from_toml(raw: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(raw)
    }

    /// Applies environment overrides.
    ///
    /// ## Environment Variables
    /// - `TILL_STORE_NAME`
    /// - `TILL_CURRENCY_SYMBOL`
    /// - `TILL_DB_PATH`
    /// - `TILL_DECREMENT_STOCK_ON_SALE` (`true`/`false`)
    /// - `TILL_OFFLINE_FALLBACK` (`true`/`false`)
    /// - `TILL_TOP_PRODUCTS_LIMIT`
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<(), ConfigError> {
        if let Some(name) = lookup("TILL_STORE_NAME") {
            self.store.name = name;
        }
        if let Some(symbol) = lookup("TILL_CURRENCY_SYMBOL") {
            self.store.currency_symbol = symbol;
        }
        if let Some(path) = lookup("TILL_DB_PATH") {
            self.database.path = Some(PathBuf::from(path));
        }
        if let Some(value) = lookup("TILL_DECREMENT_STOCK_ON_SALE") {
            self.stock.decrement_on_sale = parse_env("TILL_DECREMENT_STOCK_ON_SALE", &value)?;
        }
        if let Some(value) = lookup("TILL_OFFLINE_FALLBACK") {
            self.sales.offline_fallback = parse_env("TILL_OFFLINE_FALLBACK", &value)?;
        }
        if let Some(value) = lookup("TILL_TOP_PRODUCTS_LIMIT") {
            self.reports.top_products_limit = parse_env("TILL_TOP_PRODUCTS_LIMIT", &value)?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.store.name.trim().is_empty() {
            return Err(ConfigError::Invalid("store.name must not be empty".to_string()));
        }
        if self.store.currency_decimals > 4 {
            return Err(ConfigError::Invalid("store.currency_decimals must be at most 4".to_string()));
        }
        if self.reports.top_products_limit == 0 {
            return Err(ConfigError::Invalid("reports.top_products_limit must be positive".to_string()));
        }
        Ok(())
    }

    /// The SQLite file to open: the configured path or the platform data
    /// directory.
    pub fn database_path(&self) -> Result<PathBuf, ConfigError> {
        match &self.database.path {
            Some(path) => Ok(path.clone()),
            None => project_dirs()
                .map(|dirs| dirs.data_dir().join(DATABASE_FILE_NAME))
                .ok_or(ConfigError::NoDataDir),
        }
    }

    /// Formats a cent amount as a currency string.
    ///
    /// ## Example
    /// ```rust,ignore
    /// let config = ConfigState::default();
    /// assert_eq!(config.format_currency(1234), "$12.34");
    /// ```
    pub fn format_currency(&self, cents: i64) -> String {
        let decimals = self.store.currency_decimals as u32;
        let divisor = 10_i64.pow(decimals);
        let whole = (cents / divisor).abs();
        let frac = (cents % divisor).abs();
        let sign = if cents < 0 { "-" } else { "" };

        if decimals > 0 {
            format!(
                "{}{}{}.{:0width$}",
                sign,
                self.store.currency_symbol,
                whole,
                frac,
                width = decimals as usize
            )
        } else {
            format!("{}{}{}", sign, self.store.currency_symbol, whole)
        }
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidEnv {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("com", "till", "pos")
}

/// `till.toml` in the platform config directory.
pub fn default_config_path() -> Option<PathBuf> {
    project_dirs().map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
}
