//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router sending every path and method to the dispatcher
//! - Wire up middleware (request ID, tracing, timeout, limits)
//! - Run the synchronous dispatcher off the async runtime
//! - Turn streamed handler output into a chunked response body
//! - Sweep expired output cache entries in the background
//! - Stop gracefully on shutdown

use axum::{
    body::Body,
    extract::State,
    http::{HeaderValue, Request, StatusCode},
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use futures_util::stream;
use std::convert::Infallible;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tower::limit::ConcurrencyLimitLayer;
use tower::ServiceBuilder;
use tower_http::{
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use uuid::Uuid;

use crate::cache::{MemoryCache, OutputCache};
use crate::config::EngineConfig;
use crate::dispatch::Dispatcher;
use crate::handler::HandlerRegistry;
use crate::http::request::{RequestInfo, X_REQUEST_ID};
use crate::lifecycle::shutdown;
use crate::observability::metrics;
use crate::streaming::{BodyFrames, StreamEvent, StreamHead};

/// Frames a streaming handler may run ahead of the client.
pub const STREAM_BUFFER_FRAMES: usize = 16;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<Dispatcher>,
    pub config: Arc<EngineConfig>,
}

/// HTTP front end of the dispatch engine.
pub struct HttpServer {
    router: Router,
    state: AppState,
}

impl HttpServer {
    /// Build a server with an in-memory output cache.
    pub fn new(config: Arc<EngineConfig>, handlers: HandlerRegistry) -> Self {
        let cache: Arc<dyn OutputCache> = Arc::new(MemoryCache::new());
        let dispatcher = Arc::new(Dispatcher::new(config, handlers, cache));
        Self::with_dispatcher(dispatcher)
    }

    /// Build a server around an existing dispatcher.
    pub fn with_dispatcher(dispatcher: Arc<Dispatcher>) -> Self {
        let config = Arc::new(dispatcher.config().clone());
        let state = AppState { dispatcher, config };
        let router = Self::build_router(&state);
        Self { router, state }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(state: &AppState) -> Router {
        let config = &state.config;
        let middleware = ServiceBuilder::new()
            .layer(SetRequestIdLayer::x_request_id(UuidRequestId))
            .layer(TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                let request_id = request
                    .headers()
                    .get(X_REQUEST_ID)
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("unknown");
                tracing::info_span!(
                    "request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                )
            }))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(ConcurrencyLimitLayer::new(config.listener.max_connections))
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .map_response(|res: Response<_>| res.map(Body::new))
            .layer(RequestBodyLimitLayer::new(config.security.max_body_size));

        Router::new()
            .route("/", any(dispatch_handler))
            .route("/{*path}", any(dispatch_handler))
            .with_state(state.clone())
            .layer(middleware)
    }

    /// Shared state, for mounting the admin router next to this server.
    pub fn state(&self) -> AppState {
        self.state.clone()
    }

    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.state.dispatcher
    }

    /// The router, for serving it on a custom listener.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Serve on `listener` until `shutdown` fires, then drain in-flight requests.
    pub async fn run(
        self,
        listener: TcpListener,
        shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        if self.state.config.cache.enabled {
            spawn_cache_sweeper(
                self.state.dispatcher.cache().clone(),
                Duration::from_secs(self.state.config.cache.sweep_interval_secs),
                shutdown.resubscribe(),
            );
        }

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown::wait(shutdown))
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// UUID v4 request ids.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidRequestId;

impl MakeRequestId for UuidRequestId {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        HeaderValue::from_str(&Uuid::new_v4().to_string())
            .ok()
            .map(RequestId::new)
    }
}

/// Periodically drop expired output cache entries.
pub fn spawn_cache_sweeper(
    cache: Arc<dyn OutputCache>,
    interval: Duration,
    mut shutdown: broadcast::Receiver<()>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.tick().await;
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let removed = cache.purge_expired();
                    tracing::trace!(removed, remaining = cache.len(), "Cache sweep finished");
                }
                _ = shutdown.recv() => break,
            }
        }
        tracing::debug!("Cache sweeper stopped");
    })
}

/// Entry point for every request: read the body, dispatch on a blocking
/// thread, answer with a streamed or a buffered response.
async fn dispatch_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let started = Instant::now();
    let (parts, body) = request.into_parts();
    let method = parts.method.to_string();

    let body = match axum::body::to_bytes(body, state.config.security.max_body_size).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to read request body");
            metrics::record_http(&method, 413, started);
            return (StatusCode::PAYLOAD_TOO_LARGE, "Request body too large").into_response();
        }
    };

    let info = Arc::new(RequestInfo::from_parts(
        &parts,
        body,
        state.config.security.trust_forwarded_proto,
    ));
    let uri = info.request_uri().to_string();

    let (tx, mut rx) = mpsc::channel(STREAM_BUFFER_FRAMES);
    let dispatcher = state.dispatcher.clone();
    let span = tracing::Span::current();
    let task = tokio::task::spawn_blocking(move || {
        let _entered = span.enter();
        dispatcher.dispatch(&uri, Some(info), Some(Box::new(BodyFrames::new(tx))))
    });

    // The sink is dropped without a Start event unless the handler streams.
    let response = match rx.recv().await {
        Some(StreamEvent::Start(head)) => streamed_response(head, rx),
        _ => match task.await {
            Ok(outcome) => outcome.into_rendered().into_response(),
            Err(e) => {
                tracing::error!(error = %e, "Dispatch task failed");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
            }
        },
    };

    metrics::record_http(&method, response.status().as_u16(), started);
    response
}

fn streamed_response(head: StreamHead, rx: mpsc::Receiver<StreamEvent>) -> Response {
    let frames = stream::unfold(rx, |mut rx| async move {
        match rx.recv().await {
            Some(StreamEvent::Data(bytes)) => Some((Ok::<_, Infallible>(bytes), rx)),
            _ => None,
        }
    });

    let mut response = Response::new(Body::from_stream(frames));
    *response.status_mut() = head.status;
    *response.headers_mut() = head.headers;
    response
}
