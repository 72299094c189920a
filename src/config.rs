//! Configuration management for the tile gateway

use crate::error::{GateError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Configuration for the gateway
///
/// Passed explicitly into [`crate::Negotiator`] at construction; nothing in the
/// request path reads process-wide state.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GateConfig {
    /// Address the HTTP transport binds to (default: "0.0.0.0:8080")
    #[serde(default = "default_listen_address")]
    pub listen_address: String,

    /// Routing prefix in front of the per-map directories (default: "maps")
    ///
    /// The object store's key space does not include it.
    #[serde(default = "default_maps_root")]
    pub maps_root: String,

    /// Key served for the root path and for directory requests (default: "index.html")
    #[serde(default = "default_entry_document")]
    pub entry_document: String,

    /// max-age in seconds for objects served from the store (default: 3600)
    #[serde(default = "default_cache_max_age")]
    pub cache_max_age: u64,

    /// Base URL of the live origin server (optional)
    ///
    /// When unset, live paths are answered with 404 and no connection is made.
    #[serde(default)]
    pub live_origin: Option<String>,

    /// max-age in seconds for relayed live responses (default: 5)
    /// Valid range: 1 to 60 seconds
    #[serde(default = "default_live_cache_max_age")]
    pub live_cache_max_age: u64,

    /// Upper bound for the single live origin attempt in milliseconds (default: 10000)
    #[serde(default = "default_live_timeout_ms")]
    pub live_timeout_ms: u64,

    /// Object store backend
    #[serde(default)]
    pub store: StoreConfig,

    /// Metrics endpoint configuration (optional)
    #[serde(default)]
    pub metrics_endpoint: Option<MetricsEndpointConfig>,
}

/// Object store backend selection
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackend {
    /// Process-local map, empty at startup
    Memory,
    /// A directory whose relative file paths are the object keys
    Filesystem,
}

/// Configuration for the object store
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoreConfig {
    /// Backend type (default: filesystem)
    #[serde(default = "default_store_backend")]
    pub backend: StoreBackend,

    /// Root directory, required for the filesystem backend
    #[serde(default)]
    pub root: Option<String>,
}

/// Configuration for the operational HTTP endpoint
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MetricsEndpointConfig {
    /// Whether to enable the metrics endpoint (default: false)
    #[serde(default)]
    pub enabled: bool,

    /// Address to bind the metrics endpoint to (default: "127.0.0.1:9090")
    #[serde(default = "default_metrics_address")]
    pub address: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: default_store_backend(),
            root: None,
        }
    }
}

impl Default for MetricsEndpointConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            address: default_metrics_address(),
        }
    }
}

// Default value functions for serde
fn default_listen_address() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_maps_root() -> String {
    "maps".to_string()
}

fn default_entry_document() -> String {
    "index.html".to_string()
}

fn default_cache_max_age() -> u64 {
    3600 // 1 hour
}

fn default_live_cache_max_age() -> u64 {
    5
}

fn default_live_timeout_ms() -> u64 {
    10_000
}

fn default_store_backend() -> StoreBackend {
    StoreBackend::Filesystem
}

fn default_metrics_address() -> String {
    "127.0.0.1:9090".to_string()
}

impl Default for GateConfig {
    fn default() -> Self {
        GateConfig {
            listen_address: default_listen_address(),
            maps_root: default_maps_root(),
            entry_document: default_entry_document(),
            cache_max_age: default_cache_max_age(),
            live_origin: None,
            live_cache_max_age: default_live_cache_max_age(),
            live_timeout_ms: default_live_timeout_ms(),
            store: StoreConfig {
                backend: StoreBackend::Memory,
                root: None,
            },
            metrics_endpoint: None,
        }
    }
}

impl GateConfig {
    /// Load configuration from a YAML file
    ///
    /// # Returns
    /// * `Ok(GateConfig)` if loading and validation succeed
    /// * `Err(GateError)` if file cannot be read or config is invalid
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| {
            GateError::ConfigError(format!("Failed to read config file: {}", e))
        })?;

        Self::from_yaml(&content)
    }

    /// Parse and validate configuration from YAML text
    pub fn from_yaml(content: &str) -> Result<Self> {
        let config: GateConfig = serde_yaml::from_str(content).map_err(|e| {
            GateError::ConfigError(format!("Failed to parse config file: {}", e))
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    ///
    /// # Validation Rules
    /// - maps_root must not contain '/' at either end
    /// - entry_document must be a non-empty relative key
    /// - cache_max_age must be > 0
    /// - live_cache_max_age must be between 1 and 60 seconds
    /// - live_timeout_ms must be > 0
    /// - live_origin, when set, must be an http:// or https:// URL
    /// - the filesystem backend requires a root directory
    pub fn validate(&self) -> Result<()> {
        const MAX_LIVE_CACHE_MAX_AGE: u64 = 60;

        if self.maps_root.starts_with('/') || self.maps_root.ends_with('/') {
            return Err(GateError::config(format!(
                "maps_root must not start or end with '/', got '{}'",
                self.maps_root
            )));
        }

        if self.entry_document.is_empty() || self.entry_document.starts_with('/') {
            return Err(GateError::config(format!(
                "entry_document must be a non-empty relative key, got '{}'",
                self.entry_document
            )));
        }

        if self.cache_max_age == 0 {
            return Err(GateError::config("cache_max_age must be greater than 0"));
        }

        if self.live_cache_max_age == 0 || self.live_cache_max_age > MAX_LIVE_CACHE_MAX_AGE {
            return Err(GateError::config(format!(
                "live_cache_max_age must be between 1 and {} seconds, got {}",
                MAX_LIVE_CACHE_MAX_AGE, self.live_cache_max_age
            )));
        }

        if self.live_timeout_ms == 0 {
            return Err(GateError::config("live_timeout_ms must be greater than 0"));
        }

        if let Some(origin) = &self.live_origin {
            if !(origin.starts_with("http://") || origin.starts_with("https://")) {
                return Err(GateError::config(format!(
                    "live_origin must be an http:// or https:// URL, got '{}'",
                    origin
                )));
            }
        }

        if self.store.backend == StoreBackend::Filesystem
            && self.store.root.as_deref().map_or(true, str::is_empty)
        {
            return Err(GateError::config(
                "store.root is required when store.backend is 'filesystem'",
            ));
        }

        Ok(())
    }

    /// Whether live paths are proxied
    pub fn live_enabled(&self) -> bool {
        self.live_origin.is_some()
    }
}
