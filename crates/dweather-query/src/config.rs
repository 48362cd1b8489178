//! Facade configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use content_store::StoreConfig;
use dweather_common::{DWeatherError, DWeatherResult};

/// Everything needed to build a [`QueryFacade`](crate::QueryFacade) against a gateway.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryConfig {
    pub store: StoreConfig,

    /// YAML catalog extending the built-in dataset definitions.
    pub catalog_path: Option<PathBuf>,

    /// YAML unit table extending the built-in unit registry.
    pub unit_table_path: Option<PathBuf>,

    /// YAML alias table extending the built-in station aliases.
    pub alias_table_path: Option<PathBuf>,
}

impl QueryConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Self {
            store: StoreConfig::from_env(),
            catalog_path: std::env::var("DWEATHER_CATALOG").ok().map(PathBuf::from),
            unit_table_path: std::env::var("DWEATHER_UNIT_TABLE").ok().map(PathBuf::from),
            alias_table_path: std::env::var("DWEATHER_ALIAS_TABLE").ok().map(PathBuf::from),
        }
    }

    pub fn validate(&self) -> DWeatherResult<()> {
        self.store.validate().map_err(DWeatherError::config)?;

        // The catalog falls back to built-ins when absent; the tables do not.
        for path in [&self.unit_table_path, &self.alias_table_path].into_iter().flatten() {
            if !path.exists() {
                return Err(DWeatherError::config(format!(
                    "table {} does not exist",
                    path.display()
                )));
            }
        }

        Ok(())
    }
}
