//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming URI ("/blog/post/42?x=1")
//!     → resolver.rs (strip query, reject traversal, cascade)
//!     → lookup.rs (does `<app>/<handler>` exist?)
//!     → Return: Route { app: "blog", handler: "post", params: ["42"] }
//! ```
//!
//! # Design Decisions
//! - Handler table fixed at startup, so resolution is deterministic
//! - No regex: segments are peeled with plain string splitting
//! - Unmatched input degrades to the default handler instead of erroring
//! - Parameters are discovered right-to-left but kept in URI order

pub mod lookup;
pub mod resolver;

pub use lookup::{route_key, HandlerLookup};
pub use resolver::{is_clean, PathResolver, Route, INDEX_HANDLER};
