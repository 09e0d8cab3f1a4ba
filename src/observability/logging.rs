//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the global tracing subscriber
//! - Pick human-readable or JSON output
//!
//! # Design Decisions
//! - `RUST_LOG` overrides the configured level when set
//! - The configured level applies to this crate and tower-http only, so
//!   dependency noise stays at the env default

use tracing_subscriber::{
    fmt::{self, writer::BoxMakeWriter},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

use crate::config::ObservabilityConfig;

/// Filter used when `RUST_LOG` is not set.
pub fn default_filter(level: &str) -> String {
    format!("cascade_dispatch={level},tower_http={level}")
}

/// Install the global subscriber. Call once, before anything logs.
///
/// With `to_stderr`, stdout stays free for handler output.
pub fn init_logging(config: &ObservabilityConfig, to_stderr: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(&config.log_level)));
    let writer = if to_stderr {
        BoxMakeWriter::new(std::io::stderr)
    } else {
        BoxMakeWriter::new(std::io::stdout)
    };

    let registry = tracing_subscriber::registry().with(filter);
    if config.json_logs {
        registry.with(fmt::layer().json().with_writer(writer)).init();
    } else {
        registry.with(fmt::layer().with_writer(writer)).init();
    }
}
