//! Dispatch engine.
//!
//! # Data Flow
//! ```text
//! dispatch(uri) / run(uri, data) / hook(name, data)
//!     → routing (PathResolver: uri → app, handler, params)
//!     → dispatcher.rs
//!         → output cache hit? return it
//!         → app config (loaded once per app)
//!         → context.rs (fresh RequestContext) → handler
//!         → streamed? terminate stream, done
//!         → failure? error handler (hooks.rs / counter.rs shared throughout)
//!         → cache policy? store output
//!     → Rendered | Streamed
//! ```

pub mod context;
pub mod counter;
pub mod dispatcher;
pub mod hooks;

pub use context::RequestContext;
pub use counter::CallCounter;
pub use dispatcher::{Dispatcher, Outcome, Rendered};
pub use hooks::HookRegistry;

/// Data passed from a caller to an internally dispatched handler.
pub type Payload = serde_json::Map<String, serde_json::Value>;
