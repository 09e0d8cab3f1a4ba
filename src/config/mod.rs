//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! engine config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → EngineConfig (validated, immutable)
//!     → shared via Arc with the dispatcher and server
//!
//! First handler execution for an app:
//!     app.rs reads <apps_root>/<app>/conf/config.toml
//!     → memoized per app for the process lifetime
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; hooks are fixed at startup
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks
//! - A missing or broken app config is an empty config, never an error

pub mod app;
pub mod loader;
pub mod schema;
pub mod validation;

pub use app::{AppConfig, AppConfigCache};
pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{
    AdminConfig, CacheConfig, EngineConfig, GeneralConfig, ListenerConfig, ObservabilityConfig,
    SecurityConfig, TimeoutConfig,
};
