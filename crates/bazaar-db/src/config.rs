//! Store configuration module.
//!
//! Configuration is loaded from `BAZAAR_*` environment variables with
//! fallback to defaults.
//!
//! | Variable                    | Default              |
//! |-----------------------------|----------------------|
//! | `BAZAAR_DATABASE_PATH`      | `./bazaar.db`        |
//! | `BAZAAR_MAX_CONNECTIONS`    | `5`                  |
//! | `BAZAAR_TENANT_ID`          | `DEFAULT_TENANT_ID`  |
//! | `BAZAAR_DELIVERY_FEE_CENTS` | `0`                  |
//! | `BAZAAR_RUN_MIGRATIONS`     | `true`               |

use bazaar_core::{Money, StoreSettings, DEFAULT_TENANT_ID};
use serde::{Deserialize, Serialize};
use std::env;

use crate::pool::DbConfig;

/// Store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// SQLite database file
    pub database_path: String,

    /// Pool size
    pub max_connections: u32,

    /// Tenant every operation is scoped to
    pub tenant_id: String,

    /// Flat delivery fee in cents
    pub delivery_fee_cents: i64,

    /// Apply embedded migrations on startup
    pub run_migrations: bool,
}

impl StoreConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from any key/value source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let config = StoreConfig {
            database_path: lookup("BAZAAR_DATABASE_PATH")
                .unwrap_or_else(|| "./bazaar.db".to_string()),

            max_connections: lookup("BAZAAR_MAX_CONNECTIONS")
                .unwrap_or_else(|| "5".to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidValue("BAZAAR_MAX_CONNECTIONS".to_string()))?,

            tenant_id: lookup("BAZAAR_TENANT_ID")
                .unwrap_or_else(|| DEFAULT_TENANT_ID.to_string()),

            delivery_fee_cents: lookup("BAZAAR_DELIVERY_FEE_CENTS")
                .unwrap_or_else(|| "0".to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidValue("BAZAAR_DELIVERY_FEE_CENTS".to_string()))?,

            run_migrations: lookup("BAZAAR_RUN_MIGRATIONS")
                .unwrap_or_else(|| "true".to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidValue("BAZAAR_RUN_MIGRATIONS".to_string()))?,
        };

        if config.max_connections == 0 {
            return Err(ConfigError::InvalidValue("BAZAAR_MAX_CONNECTIONS".to_string()));
        }
        if config.delivery_fee_cents < 0 {
            return Err(ConfigError::InvalidValue("BAZAAR_DELIVERY_FEE_CENTS".to_string()));
        }
        if config.tenant_id.trim().is_empty() {
            return Err(ConfigError::MissingRequired("BAZAAR_TENANT_ID".to_string()));
        }

        Ok(config)
    }

    /// Pricing settings handed to the services.
    pub fn settings(&self) -> StoreSettings {
        StoreSettings {
            tenant_id: self.tenant_id.clone(),
            delivery_fee: Money::from_cents(self.delivery_fee_cents),
        }
    }

    /// Database configuration for [`crate::Database::new`].
    pub fn db_config(&self) -> DbConfig {
        DbConfig::new(&self.database_path)
            .max_connections(self.max_connections)
            .run_migrations(self.run_migrations)
            .settings(self.settings())
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = StoreConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config.database_path, "./bazaar.db");
        assert_eq!(config.max_connections, 5);
        assert_eq!(config.tenant_id, DEFAULT_TENANT_ID);
        assert_eq!(config.delivery_fee_cents, 0);
        assert!(config.run_migrations);
    }

    #[test]
    fn test_overrides() {
        let config = StoreConfig::from_lookup(lookup_from(&[
            ("BAZAAR_DATABASE_PATH", "/tmp/shop.db"),
            ("BAZAAR_DELIVERY_FEE_CENTS", "4900"),
            ("BAZAAR_RUN_MIGRATIONS", "false"),
        ]))
        .unwrap();

        assert_eq!(config.database_path, "/tmp/shop.db");
        assert_eq!(config.settings().delivery_fee.cents(), 4900);
        assert!(!config.db_config().run_migrations);
    }

    #[test]
    fn test_invalid_values() {
        let err = StoreConfig::from_lookup(lookup_from(&[("BAZAAR_MAX_CONNECTIONS", "many")]));
        assert!(matches!(err, Err(ConfigError::InvalidValue(_))));

        let err = StoreConfig::from_lookup(lookup_from(&[("BAZAAR_DELIVERY_FEE_CENTS", "-1")]));
        assert!(matches!(err, Err(ConfigError::InvalidValue(_))));
    }
}
