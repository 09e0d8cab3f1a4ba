//! Cascading request dispatch engine.
//!
//! Resolves filesystem-style URIs to registered handlers, peeling unmatched
//! trailing segments into positional parameters, and runs the handler with
//! isolated per-request state. Handlers can dispatch to each other, fire
//! hooks, cache their output and stream it in chunks.

// Core engine
pub mod cache;
pub mod config;
pub mod dispatch;
pub mod handler;
pub mod routing;
pub mod streaming;

// Hosting
pub mod admin;
pub mod apps;
pub mod http;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;

pub use config::schema::EngineConfig;
pub use dispatch::{Dispatcher, Outcome, Payload, Rendered, RequestContext};
pub use handler::{Handler, HandlerError, HandlerRegistry, HandlerResult, Restful};
pub use http::HttpServer;
pub use lifecycle::Shutdown;
