//! Handler existence checks.
//!
//! # Responsibilities
//! - Answer "is there a handler at `<app>/<handler>`?"
//!
//! # Design Decisions
//! - The resolver only needs a yes/no answer, so it depends on this trait
//!   and never on how handlers are stored
//! - Answers are advisory: the handler table is fixed after startup

use std::collections::HashSet;

/// Trait for checking whether a handler exists for an app.
pub trait HandlerLookup: Send + Sync {
    /// Returns true if `<app>/<handler>` names a known handler.
    fn contains(&self, app: &str, handler: &str) -> bool;
}

/// Build the `app/handler` key used throughout the engine.
pub fn route_key(app: &str, handler: &str) -> String {
    format!("{app}/{handler}")
}

impl HandlerLookup for HashSet<String> {
    fn contains(&self, app: &str, handler: &str) -> bool {
        HashSet::contains(self, &route_key(app, handler))
    }
}
