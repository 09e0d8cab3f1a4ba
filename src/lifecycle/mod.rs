//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Shutdown::trigger
//!
//! Shutdown (shutdown.rs):
//!     broadcast → HTTP server stops accepting, drains in-flight requests
//!               → admin server stops
//!               → cache sweeper exits
//! ```
//!
//! # Design Decisions
//! - Startup order lives in `main`: config, logging, metrics, then listeners
//! - There is no reload signal; hooks and handlers are fixed for the
//!   process lifetime

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
pub use signals::{shutdown_signal, spawn_signal_listener};
