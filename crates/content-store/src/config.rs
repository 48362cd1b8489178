//! Configuration for content store access.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for reaching the snapshot store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Base URL of the HTTP gateway.
    pub gateway_url: String,

    /// Per-call timeout in seconds.
    pub request_timeout_secs: u64,

    /// Number of snapshot metadata documents kept in the LRU cache.
    pub metadata_cache_entries: usize,

    /// Path of the dataset-name to head-hash document.
    pub heads_path: String,

    /// Prefix under which snapshot directories live.
    pub snapshot_prefix: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            gateway_url: "http://localhost:8080".to_string(),
            request_timeout_secs: 30,
            metadata_cache_entries: 1024,
            heads_path: "climate/hashes/heads.json".to_string(),
            snapshot_prefix: "ipfs".to_string(),
        }
    }
}

impl StoreConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("DWEATHER_GATEWAY_URL") {
            config.gateway_url = val;
        }

        if let Ok(val) = std::env::var("DWEATHER_TIMEOUT_SECS") {
            if let Ok(secs) = val.parse() {
                config.request_timeout_secs = secs;
            }
        }

        if let Ok(val) = std::env::var("DWEATHER_METADATA_CACHE_ENTRIES") {
            if let Ok(entries) = val.parse() {
                config.metadata_cache_entries = entries;
            }
        }

        if let Ok(val) = std::env::var("DWEATHER_HEADS_PATH") {
            config.heads_path = val;
        }

        if let Ok(val) = std::env::var("DWEATHER_SNAPSHOT_PREFIX") {
            config.snapshot_prefix = val;
        }

        config
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.request_timeout_secs == 0 {
            return Err("request_timeout_secs must be > 0".to_string());
        }

        if self.metadata_cache_entries == 0 {
            return Err("metadata_cache_entries must be > 0".to_string());
        }

        if self.heads_path.trim_matches('/').is_empty() {
            return Err("heads_path must not be empty".to_string());
        }

        if !self.gateway_url.starts_with("http://") && !self.gateway_url.starts_with("https://")
        {
            return Err(format!(
                "gateway_url must be an http(s) URL, got '{}'",
                self.gateway_url
            ));
        }

        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(StoreConfig::default().validate().is_ok());
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let config = StoreConfig {
            request_timeout_secs: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_non_http_gateway_rejected() {
        let config = StoreConfig {
            gateway_url: "ftp://example.org".to_string(),
            ..Default::default()
        };
        assert!(config.validate().unwrap_err().contains("gateway_url"));
    }

    #[test]
    fn test_timeout_duration() {
        let config = StoreConfig {
            request_timeout_secs: 7,
            ..Default::default()
        };
        assert_eq!(config.request_timeout(), Duration::from_secs(7));
    }
}
