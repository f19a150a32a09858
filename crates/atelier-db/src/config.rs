//! # Atelier Configuration
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     ATELIER_DATABASE_PATH=/var/lib/atelier/atelier.db                  │
//! │     ATELIER_RATE_USD=0.00065                                           │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/atelier/atelier.toml (Linux)                             │
//! │     ~/Library/Application Support/ng.atelier.atelier/ (macOS)          │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │     ./atelier.db, no exchange rates, merge duplicate lines             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! [database]
//! path = "/var/lib/atelier/atelier.db"
//! max_connections = 5
//!
//! # Units of each currency one naira buys
//! [currency.rates]
//! USD = "0.00065"
//! EUR = "0.0006"
//! GBP = "0.00051"
//!
//! [orders]
//! duplicate_lines = "merge"     # merge | reject
//! direct_fulfillment = false    # allow Processing → Delivered for offline sales
//! ```

use atelier_core::currency::RateTable;
use atelier_core::money::Currency;
use atelier_core::pricing::DuplicateLinePolicy;
use atelier_core::status::TransitionPolicy;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::error::{DbError, DbResult};
use crate::pool::DbConfig;

// =============================================================================
// Database Settings
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// SQLite file. Created if missing.
    #[serde(default = "default_database_path")]
    pub path: PathBuf,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    #[serde(default = "default_min_connections")]
    pub min_connections: u32,

    /// Seconds to wait for a pooled connection.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    #[serde(default = "default_true")]
    pub run_migrations: bool,
}

fn default_database_path() -> PathBuf {
    PathBuf::from("atelier.db")
}

fn default_max_connections() -> u32 {
    5
}

fn default_min_connections() -> u32 {
    1
}

fn default_connect_timeout() -> u64 {
    30
}

fn default_true() -> bool {
    true
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        DatabaseSettings {
            path: default_database_path(),
            max_connections: default_max_connections(),
            min_connections: default_min_connections(),
            connect_timeout_secs: default_connect_timeout(),
            run_migrations: true,
        }
    }
}

// =============================================================================
// Currency Settings
// =============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CurrencySettings {
    /// Quotes against NGN. A currency without a quote can still be sold
    /// where the product lists a price in it directly.
    #[serde(default)]
    pub rates: RateTable,
}

// =============================================================================
// Order Settings
// =============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrderSettings {
    #[serde(default)]
    pub duplicate_lines: DuplicateLinePolicy,

    #[serde(default)]
    pub direct_fulfillment: bool,
}

// =============================================================================
// Atelier Config
// =============================================================================

/// Complete configuration of the fulfillment core.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AtelierConfig {
    #[serde(default)]
    pub database: DatabaseSettings,

    #[serde(default)]
    pub currency: CurrencySettings,

    #[serde(default)]
    pub orders: OrderSettings,
}

impl AtelierConfig {
    /// Loads configuration: defaults, then the TOML file, then environment.
    ///
    /// With `config_path = None` the platform config directory is searched.
    /// A missing file is not an error.
    pub fn load(config_path: Option<PathBuf>) -> DbResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading atelier config from file");
                let contents = std::fs::read_to_string(&path)
                    .map_err(|e| DbError::Config(format!("{}: {}", path.display(), e)))?;
                config = Self::from_toml(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Parses a TOML document.
    pub fn from_toml(contents: &str) -> DbResult<Self> {
        toml::from_str(contents).map_err(|e| DbError::Config(e.to_string()))
    }

    /// Serialises to pretty TOML.
    pub fn to_toml(&self) -> DbResult<String> {
        toml::to_string_pretty(self).map_err(|e| DbError::Config(e.to_string()))
    }

    /// Validates the configuration.
    pub fn validate(&self) -> DbResult<()> {
        if self.database.path.as_os_str().is_empty() {
            return Err(DbError::Config("database.path must not be empty".into()));
        }

        if self.database.max_connections == 0 {
            return Err(DbError::Config(
                "database.max_connections must be greater than 0".into(),
            ));
        }

        if self.database.min_connections > self.database.max_connections {
            return Err(DbError::Config(format!(
                "database.min_connections ({}) exceeds max_connections ({})",
                self.database.min_connections, self.database.max_connections
            )));
        }

        self.currency.rates.validate()?;

        Ok(())
    }

    /// Applies `ATELIER_*` environment overrides.
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Applies overrides from any key lookup. Unparseable values are logged
    /// and ignored.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(path) = lookup("ATELIER_DATABASE_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.database.path = PathBuf::from(path);
        }

        if let Some(max) = lookup("ATELIER_MAX_CONNECTIONS") {
            match max.parse::<u32>() {
                Ok(m) => self.database.max_connections = m,
                Err(_) => warn!(value = %max, "Invalid ATELIER_MAX_CONNECTIONS"),
            }
        }

        for currency in Currency::ALL.into_iter().filter(|c| !c.is_canonical()) {
            let key = format!("ATELIER_RATE_{}", currency.code());
            let Some(raw) = lookup(&key) else {
                continue;
            };
            let parsed = Decimal::from_str(raw.trim())
                .map_err(|e| e.to_string())
                .and_then(|rate| {
                    self.currency
                        .rates
                        .set_rate(currency, rate)
                        .map_err(|e| e.to_string())
                });
            match parsed {
                Ok(()) => debug!(%currency, rate = %raw, "Overriding exchange rate from environment"),
                Err(reason) => warn!(key = %key, value = %raw, %reason, "Ignoring invalid exchange rate"),
            }
        }

        if let Some(policy) = lookup("ATELIER_DUPLICATE_LINES") {
            match policy.parse() {
                Ok(parsed) => self.orders.duplicate_lines = parsed,
                Err(_) => warn!(value = %policy, "Unknown duplicate line policy in environment"),
            }
        }

        if let Some(flag) = lookup("ATELIER_DIRECT_FULFILLMENT") {
            match flag.trim().to_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => self.orders.direct_fulfillment = true,
                "0" | "false" | "no" | "off" => self.orders.direct_fulfillment = false,
                _ => warn!(value = %flag, "Invalid ATELIER_DIRECT_FULFILLMENT"),
            }
        }
    }

    /// Returns the default config file path.
    fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("ng", "atelier", "atelier")
            .map(|dirs| dirs.config_dir().join("atelier.toml"))
    }

    // =========================================================================
    // Convenience Methods
    // =========================================================================

    /// Pool settings for [`crate::Database::new`].
    pub fn db_config(&self) -> DbConfig {
        DbConfig::new(self.database.path.clone())
            .max_connections(self.database.max_connections)
            .min_connections(self.database.min_connections)
            .connect_timeout(Duration::from_secs(self.database.connect_timeout_secs))
            .run_migrations(self.database.run_migrations)
    }

    pub fn rates(&self) -> &RateTable {
        &self.currency.rates
    }

    pub fn transition_policy(&self) -> TransitionPolicy {
        TransitionPolicy {
            direct_fulfillment: self.orders.direct_fulfillment,
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = AtelierConfig::default();
        assert_eq!(config.database.path, PathBuf::from("atelier.db"));
        assert_eq!(config.database.max_connections, 5);
        assert_eq!(config.orders.duplicate_lines, DuplicateLinePolicy::Merge);
        assert!(!config.orders.direct_fulfillment);
        assert_eq!(config.rates().currencies(), vec![Currency::Ngn]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_toml() {
        let config = AtelierConfig::from_toml(
            r#"
            [database]
            path = "/tmp/shop.db"

            [currency.rates]
            USD = "0.00065"
            EUR = "0.0006"

            [orders]
            duplicate_lines = "reject"
            direct_fulfillment = true
            "#,
        )
        .unwrap();

        assert_eq!(config.database.path, PathBuf::from("/tmp/shop.db"));
        assert_eq!(config.database.max_connections, 5);
        assert_eq!(config.rates().quote(Currency::Usd), Some(Decimal::new(65, 5)));
        assert_eq!(config.rates().quote(Currency::Gbp), None);
        assert_eq!(config.orders.duplicate_lines, DuplicateLinePolicy::Reject);
        assert!(config.transition_policy().direct_fulfillment);
    }

    #[test]
    fn test_toml_round_trip_preserves_rates() {
        let mut config = AtelierConfig::default();
        config.currency.rates.set_rate(Currency::Gbp, Decimal::new(51, 5)).unwrap();
        let text = config.to_toml().unwrap();
        let back = AtelierConfig::from_toml(&text).unwrap();
        assert_eq!(back.rates(), config.rates());
    }

    #[test]
    fn test_invalid_rate_fails_validation() {
        let config = AtelierConfig::from_toml("[currency.rates]\nUSD = \"-1\"\n").unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_pool_sizes() {
        let mut config = AtelierConfig::default();
        config.database.max_connections = 0;
        assert!(config.validate().is_err());

        config.database.max_connections = 2;
        config.database.min_connections = 3;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("ATELIER_DATABASE_PATH", "/data/atelier.db"),
            ("ATELIER_MAX_CONNECTIONS", "8"),
            ("ATELIER_RATE_USD", "0.00065"),
            ("ATELIER_RATE_EUR", "not-a-number"),
            ("ATELIER_DUPLICATE_LINES", "reject"),
            ("ATELIER_DIRECT_FULFILLMENT", "yes"),
        ]);

        let mut config = AtelierConfig::default();
        config.apply_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.database.path, PathBuf::from("/data/atelier.db"));
        assert_eq!(config.database.max_connections, 8);
        assert_eq!(config.rates().quote(Currency::Usd), Some(Decimal::new(65, 5)));
        assert_eq!(config.rates().quote(Currency::Eur), None);
        assert_eq!(config.orders.duplicate_lines, DuplicateLinePolicy::Reject);
        assert!(config.orders.direct_fulfillment);
    }

    #[test]
    fn test_db_config_from_settings() {
        let mut config = AtelierConfig::default();
        config.database.max_connections = 3;
        config.database.run_migrations = false;
        let db = config.db_config();
        assert_eq!(db.max_connections, 3);
        assert!(!db.run_migrations);
    }
}
