//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the engine.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Root configuration for the dispatch engine.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct EngineConfig {
    /// Listener configuration (bind address, connection limit).
    pub listener: ListenerConfig,

    /// Default and error handler routes, handler tree root.
    pub general: GeneralConfig,

    /// Hook name -> ordered handler URIs.
    pub hooks: HashMap<String, Vec<String>>,

    /// Output cache settings.
    pub cache: CacheConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    #[serde(default)]
    pub admin: AdminConfig,

    #[serde(default)]
    pub security: SecurityConfig,

    /// Any other sections, reachable through [`EngineConfig::conf`].
    #[serde(flatten)]
    pub extra: toml::Table,
}

impl EngineConfig {
    /// Look up a single value as a string.
    ///
    /// Section names are case-insensitive, so `conf("General", "default_handler")`
    /// and `conf("general", "default_handler")` are the same lookup. Typed
    /// sections are consulted first, then any extra section from the file.
    pub fn conf(&self, section: &str, key: &str) -> Option<String> {
        let section = section.to_ascii_lowercase();
        if section == "general" {
            match key {
                "default_handler" => return Some(self.general.default_handler.clone()),
                "error_handler" => return Some(self.general.error_handler.clone()),
                "apps_root" => return Some(self.general.apps_root.clone()),
                _ => {}
            }
        }

        let table = self
            .extra
            .iter()
            .find(|(name, _)| name.to_ascii_lowercase() == section)
            .and_then(|(_, value)| value.as_table())?;

        table.get(key).map(|value| match value {
            toml::Value::String(s) => s.clone(),
            other => other.to_string(),
        })
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Maximum concurrent in-flight requests.
    pub max_connections: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            max_connections: 10_000,
        }
    }
}

/// The `[general]` section.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Route used for `/`, rejected URIs and unmatched apps ("app/handler").
    pub default_handler: String,

    /// Route that renders error pages ("app/handler").
    pub error_handler: String,

    /// Directory holding `<app>/conf/config.toml` files.
    pub apps_root: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            default_handler: "main/index".to_string(),
            error_handler: "main/error".to_string(),
            apps_root: "apps".to_string(),
        }
    }
}

/// Output cache configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Enable handler output caching.
    pub enabled: bool,

    /// How often expired entries are purged, in seconds.
    pub sweep_interval_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            sweep_interval_secs: 60,
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Emit JSON log lines instead of the human-readable format.
    pub json_logs: bool,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Admin API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Enable admin API.
    pub enabled: bool,

    /// API key for authentication (Bearer token).
    pub api_key: String,

    /// Admin API bind address.
    pub bind_address: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            // WARNING: This is a placeholder! Change this in production.
            api_key: "CHANGE_ME_IN_PRODUCTION".to_string(),
            bind_address: "127.0.0.1:8081".to_string(),
        }
    }
}

/// Request hardening configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Maximum body size in bytes.
    pub max_body_size: usize,
    /// Treat `X-Forwarded-Proto: https` as an HTTPS request.
    pub trust_forwarded_proto: bool,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            max_body_size: 2 * 1024 * 1024, // 2MB
            trust_forwarded_proto: false,
        }
    }
}
