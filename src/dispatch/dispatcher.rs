//! Request dispatch.
//!
//! # Responsibilities
//! - Resolve URIs against the handler table
//! - Serve cached output before doing any other work
//! - Load per-app configuration once per app
//! - Run handlers with a fresh context, catching failures and panics
//! - Store output according to the handler's cache policy
//! - Route failures to the configured error handler
//! - Fire hooks and count internal dispatches
//!
//! # Design Decisions
//! - Everything process-wide (hooks, counters, app configs, output cache)
//!   is owned here and shared by reference with nested dispatches
//! - Dispatch is synchronous; the HTTP layer runs it on a blocking thread
//! - Error pages are never cached and a failing error handler falls back to
//!   a plain text body, so error rendering cannot recurse

use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use bytes::Bytes;
use std::any::Any;
use std::borrow::Cow;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;

use crate::cache::{self, cache_key, OutputCache};
use crate::config::{AppConfigCache, EngineConfig};
use crate::dispatch::context::RequestContext;
use crate::dispatch::counter::CallCounter;
use crate::dispatch::hooks::HookRegistry;
use crate::dispatch::Payload;
use crate::handler::{ErrorStatus, HandlerError, HandlerRegistry};
use crate::http::request::RequestInfo;
use crate::http::response::plain_text_headers;
use crate::observability::metrics;
use crate::routing::{PathResolver, Route};
use crate::streaming::FrameSink;

/// A fully buffered handler result.
#[derive(Debug, Clone)]
pub struct Rendered {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl Rendered {
    pub fn ok(body: impl Into<Bytes>) -> Self {
        Self {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            body: body.into(),
        }
    }

    pub fn empty() -> Self {
        Self::ok(Bytes::new())
    }

    /// `302 Found` pointing at `location`.
    pub fn redirect(location: &str) -> Self {
        let mut rendered = Self::empty();
        rendered.status = StatusCode::FOUND;
        match HeaderValue::from_str(location) {
            Ok(value) => {
                rendered.headers.insert(header::LOCATION, value);
            }
            Err(_) => {
                tracing::warn!(location = %location, "Redirect target is not a valid header value");
                rendered.status = StatusCode::INTERNAL_SERVER_ERROR;
            }
        }
        rendered
    }

    /// Redirect target, when this is a redirect.
    pub fn location(&self) -> Option<&str> {
        if !self.status.is_redirection() {
            return None;
        }
        self.headers.get(header::LOCATION)?.to_str().ok()
    }

    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }

    fn fallback(status: &ErrorStatus) -> Self {
        Self {
            status: status.status_code(),
            headers: plain_text_headers(),
            body: Bytes::from(status.to_string()),
        }
    }
}

/// What a dispatch produced.
#[derive(Debug)]
pub enum Outcome {
    /// Output was buffered and is ready to send.
    Rendered(Rendered),
    /// Output already went to the frame sink, terminator included.
    Streamed,
}

impl Outcome {
    /// The buffered result; streamed outcomes yield an empty body.
    pub fn into_rendered(self) -> Rendered {
        match self {
            Self::Rendered(rendered) => rendered,
            Self::Streamed => Rendered::empty(),
        }
    }
}

/// The dispatch engine.
pub struct Dispatcher {
    config: Arc<EngineConfig>,
    resolver: PathResolver,
    handlers: HandlerRegistry,
    hooks: HookRegistry,
    calls: CallCounter,
    app_configs: AppConfigCache,
    cache: Arc<dyn OutputCache>,
    cli: bool,
}

impl Dispatcher {
    pub fn new(
        config: Arc<EngineConfig>,
        handlers: HandlerRegistry,
        cache: Arc<dyn OutputCache>,
    ) -> Self {
        tracing::debug!(
            handlers = handlers.len(),
            hooks = config.hooks.len(),
            default_handler = %config.general.default_handler,
            error_handler = %config.general.error_handler,
            "Dispatcher initialized"
        );
        Self {
            resolver: PathResolver::new(config.general.default_handler.clone()),
            hooks: HookRegistry::from_config(&config),
            calls: CallCounter::new(),
            app_configs: AppConfigCache::new(&config.general.apps_root),
            handlers,
            cache,
            config,
            cli: false,
        }
    }

    /// Mark dispatches as originating from the command line.
    pub fn with_cli(mut self, cli: bool) -> Self {
        self.cli = cli;
        self
    }

    pub fn resolve(&self, uri: &str) -> Route {
        self.resolver.resolve(uri, &self.handlers)
    }

    /// Serve an external request for `uri`.
    ///
    /// With a sink, handlers may stream; otherwise output is buffered.
    pub fn dispatch(
        &self,
        uri: &str,
        request: Option<Arc<RequestInfo>>,
        sink: Option<Box<dyn FrameSink>>,
    ) -> Outcome {
        let route = self.resolve(uri);
        tracing::debug!(
            uri = %uri,
            app = %route.app,
            handler = %route.handler,
            params = ?route.params,
            "Dispatching request"
        );
        self.execute(route, false, Payload::new(), request, sink)
    }

    /// Dispatch `uri` internally with `data` and return its output.
    pub fn run(&self, uri: &str, data: Payload) -> Rendered {
        self.run_with(uri, data, None)
    }

    pub(crate) fn run_with(
        &self,
        uri: &str,
        data: Payload,
        request: Option<Arc<RequestInfo>>,
    ) -> Rendered {
        let route = self.resolve(uri);
        self.calls.increment(uri);
        self.execute(route, true, data, request, None).into_rendered()
    }

    /// Run an already resolved route.
    pub fn handle(&self, route: Route, internal: bool, data: Payload) -> Outcome {
        self.execute(route, internal, data, None, None)
    }

    /// Run every handler registered for hook `name`, discarding output.
    ///
    /// Returns false when the hook does not exist.
    pub fn hook(&self, name: &str, data: &Payload) -> bool {
        self.fire(name, data, None)
    }

    pub(crate) fn fire(
        &self,
        name: &str,
        data: &Payload,
        request: Option<&Arc<RequestInfo>>,
    ) -> bool {
        let Some(uris) = self.hooks.get(name) else {
            tracing::debug!(hook = %name, "Hook not found");
            return false;
        };
        for uri in uris {
            metrics::record_hook(name);
            let _ = self.run_with(uri, data.clone(), request.cloned());
        }
        true
    }

    /// Render the error handler with `{code, title, message}`.
    pub fn error(&self, code: u16, title: &str, message: &str) -> Rendered {
        self.render_error(ErrorStatus::new(code, title, message), None)
    }

    fn execute(
        &self,
        route: Route,
        internal: bool,
        data: Payload,
        request: Option<Arc<RequestInfo>>,
        sink: Option<Box<dyn FrameSink>>,
    ) -> Outcome {
        let started = Instant::now();
        let uri = route.uri();
        let app = route.app.clone();
        let key = cache_key(&uri);

        if self.config.cache.enabled {
            match self.cache.get(&key) {
                Some(hit) if !hit.is_empty() => {
                    tracing::trace!(uri = %uri, key = %key, "Serving cached output");
                    metrics::record_cache("hit");
                    metrics::record_dispatch(&app, internal, "cached", started);
                    return Outcome::Rendered(Rendered::ok(hit));
                }
                _ => metrics::record_cache("miss"),
            }
        }

        let app_config = self.app_configs.get_or_load(&app);

        let Some(handler) = self.handlers.get(&uri) else {
            tracing::warn!(uri = %uri, "Resolved route has no handler");
            metrics::record_dispatch(&app, internal, "missing", started);
            return Outcome::Rendered(self.render_error(ErrorStatus::not_found(), Some(&uri)));
        };

        let mut ctx = RequestContext::new(self, route, data, internal, request, app_config, sink);
        let result = panic::catch_unwind(AssertUnwindSafe(|| handler.call(&mut ctx)))
            .unwrap_or_else(|payload| Err(HandlerError::Internal(panic_message(&*payload))));

        if ctx.is_streaming() {
            if let Err(err) = &result {
                tracing::warn!(uri = %uri, error = %err, "Handler failed after streaming started");
            }
            if let Err(err) = ctx.finish_stream() {
                tracing::debug!(uri = %uri, error = %err, "Stream closed early");
            }
            metrics::record_dispatch(&app, internal, "streamed", started);
            return Outcome::Streamed;
        }

        match result {
            Ok(()) => {
                let policy = ctx.cache_policy();
                let rendered = ctx.into_rendered();
                if let Some(ttl) = policy.expiry().filter(|_| self.config.cache.enabled) {
                    let replaced = cache::store(&*self.cache, &key, rendered.body.clone(), ttl);
                    tracing::trace!(uri = %uri, key = %key, replaced, ttl = ?ttl, "Stored output");
                    metrics::record_cache("store");
                }
                metrics::record_dispatch(&app, internal, "ok", started);
                Outcome::Rendered(rendered)
            }
            Err(err) => {
                drop(ctx);
                metrics::record_dispatch(&app, internal, "error", started);
                Outcome::Rendered(self.fail(&uri, err))
            }
        }
    }

    fn fail(&self, uri: &str, err: HandlerError) -> Rendered {
        match err {
            HandlerError::Redirect(location) => Rendered::redirect(&location),
            HandlerError::Status(status) => self.render_error(status, Some(uri)),
            other => {
                tracing::error!(uri = %uri, error = %other, "Handler failed");
                self.render_error(ErrorStatus::internal(), Some(uri))
            }
        }
    }

    fn render_error(&self, status: ErrorStatus, failed_uri: Option<&str>) -> Rendered {
        let error_uri = self.config.general.error_handler.trim_matches('/');
        if failed_uri == Some(error_uri) || self.handlers.get(error_uri).is_none() {
            return Rendered::fallback(&status);
        }

        let mut data = Payload::new();
        data.insert("code".into(), status.code.into());
        data.insert("title".into(), status.title.clone().into());
        data.insert("message".into(), status.message.clone().into());

        let mut rendered = self.run(error_uri, data);
        if rendered.location().is_none() {
            rendered.status = status.status_code();
        }
        rendered
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn handlers(&self) -> &HandlerRegistry {
        &self.handlers
    }

    pub fn hooks(&self) -> &HookRegistry {
        &self.hooks
    }

    pub fn calls(&self) -> &CallCounter {
        &self.calls
    }

    pub fn app_configs(&self) -> &AppConfigCache {
        &self.app_configs
    }

    pub fn cache(&self) -> &Arc<dyn OutputCache> {
        &self.cache
    }

    pub fn is_cli(&self) -> bool {
        self.cli
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    let detail = payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic payload".to_string());
    format!("handler panicked: {detail}")
}
