//! Per-app configuration.
//!
//! Each app may ship `<apps_root>/<app>/conf/config.toml`, a file of sections
//! holding key/value pairs. It is read the first time any handler of that app
//! executes and kept for the life of the process.

use dashmap::DashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::loader::ConfigError;

/// Parsed configuration of a single app.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AppConfig {
    sections: toml::Table,
}

impl AppConfig {
    /// An app without configuration.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Parse configuration text.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            sections: toml::from_str(content)?,
        })
    }

    /// Read and parse a configuration file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Look up `key` in `section`.
    pub fn get(&self, section: &str, key: &str) -> Option<&toml::Value> {
        self.section(section)?.get(key)
    }

    /// Look up a string value.
    pub fn get_str(&self, section: &str, key: &str) -> Option<&str> {
        self.get(section, key)?.as_str()
    }

    /// A whole section.
    pub fn section(&self, name: &str) -> Option<&toml::Table> {
        self.sections.get(name)?.as_table()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }
}

/// Lazily populated app name -> configuration map.
#[derive(Debug)]
pub struct AppConfigCache {
    root: PathBuf,
    entries: DashMap<String, Arc<AppConfig>>,
}

impl AppConfigCache {
    /// Create a cache reading files below `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            entries: DashMap::new(),
        }
    }

    /// Path of the configuration file for `app`.
    pub fn path_for(&self, app: &str) -> PathBuf {
        self.root.join(app).join("conf").join("config.toml")
    }

    /// Return the configuration of `app`, loading it on first use.
    ///
    /// The entry lock is held while loading, so each app is read at most once
    /// even when several requests arrive together. A missing or broken file
    /// yields an empty configuration.
    pub fn get_or_load(&self, app: &str) -> Arc<AppConfig> {
        if let Some(config) = self.entries.get(app) {
            return Arc::clone(config.value());
        }

        let entry = self
            .entries
            .entry(app.to_string())
            .or_insert_with(|| Arc::new(self.load(app)));
        Arc::clone(entry.value())
    }

    /// Whether `app` has been loaded already.
    pub fn is_loaded(&self, app: &str) -> bool {
        self.entries.contains_key(app)
    }

    fn load(&self, app: &str) -> AppConfig {
        if app.is_empty() || app.contains("..") {
            return AppConfig::empty();
        }

        let path = self.path_for(app);
        if !path.exists() {
            tracing::debug!(app = %app, path = ?path, "No app configuration, using empty");
            return AppConfig::empty();
        }

        match AppConfig::load(&path) {
            Ok(config) => {
                tracing::debug!(app = %app, "App configuration loaded");
                config
            }
            Err(e) => {
                tracing::warn!(app = %app, path = ?path, error = %e, "Failed to load app configuration, using empty");
                AppConfig::empty()
            }
        }
    }
}
