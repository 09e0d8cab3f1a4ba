//! Route key → handler table.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::dispatch::RequestContext;
use crate::handler::{Handler, HandlerResult};
use crate::routing::lookup::{route_key, HandlerLookup};

/// Handlers known to the dispatcher, keyed by `app/handler`.
#[derive(Clone, Default)]
pub struct HandlerRegistry {
    handlers: HashMap<String, Arc<dyn Handler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler object under `key` (`app/handler`, slashes trimmed).
    pub fn register<H: Handler + 'static>(&mut self, key: &str, handler: H) -> &mut Self {
        let key = key.trim_matches('/');
        if !key.contains('/') {
            tracing::warn!(key = %key, "Handler key has no app prefix and can never be resolved");
        }
        if self.handlers.insert(key.to_string(), Arc::new(handler)).is_some() {
            tracing::debug!(key = %key, "Replaced existing handler");
        }
        self
    }

    /// Register a closure as a handler.
    pub fn register_fn<F>(&mut self, key: &str, f: F) -> &mut Self
    where
        F: Fn(&mut RequestContext<'_>) -> HandlerResult + Send + Sync + 'static,
    {
        self.register(key, f)
    }

    pub fn get(&self, key: &str) -> Option<Arc<dyn Handler>> {
        self.handlers.get(key.trim_matches('/')).cloned()
    }

    /// Registered keys, sorted.
    pub fn keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        keys.sort_unstable();
        keys
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl HandlerLookup for HandlerRegistry {
    fn contains(&self, app: &str, handler: &str) -> bool {
        self.handlers.contains_key(&route_key(app, handler))
    }
}

impl fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("handlers", &self.keys())
            .finish()
    }
}
