//! Per-dispatch handler state.
//!
//! # Responsibilities
//! - Expose the resolved route, parameters and caller payload to a handler
//! - Own the output buffer the handler writes into
//! - Carry the response status, headers and cache policy the handler sets
//! - Drive chunked streaming for external requests
//! - Give handlers access to internal dispatch, hooks and request helpers
//!
//! # Design Decisions
//! - One context per dispatch, never shared; nested `run` calls get their own
//! - The buffer lives and dies with the context, so every exit path
//!   (including failures and panics) releases it

use axum::http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode};
use bytes::{Bytes, BytesMut};
use serde_json::Value;
use std::collections::HashMap;
use std::io;
use std::sync::Arc;

use crate::cache::CachePolicy;
use crate::config::AppConfig;
use crate::dispatch::dispatcher::{Dispatcher, Rendered};
use crate::dispatch::Payload;
use crate::handler::HandlerError;
use crate::http::request::RequestInfo;
use crate::http::response::absolutize;
use crate::routing::Route;
use crate::streaming::{Chunk, ChunkEncoder, FrameSink, StreamError, StreamHead};

pub struct RequestContext<'a> {
    dispatcher: &'a Dispatcher,
    route: Route,
    uri: String,
    data: Payload,
    internal: bool,
    request: Option<Arc<RequestInfo>>,
    app_config: Arc<AppConfig>,
    cache: CachePolicy,
    status: StatusCode,
    headers: HeaderMap,
    buffer: BytesMut,
    stream: Option<ChunkEncoder<Box<dyn FrameSink>>>,
}

impl<'a> RequestContext<'a> {
    pub(crate) fn new(
        dispatcher: &'a Dispatcher,
        route: Route,
        data: Payload,
        internal: bool,
        request: Option<Arc<RequestInfo>>,
        app_config: Arc<AppConfig>,
        sink: Option<Box<dyn FrameSink>>,
    ) -> Self {
        let uri = route.uri();
        Self {
            dispatcher,
            route,
            uri,
            data,
            internal,
            request,
            app_config,
            cache: CachePolicy::Disabled,
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            buffer: BytesMut::new(),
            stream: sink.map(ChunkEncoder::new),
        }
    }

    // Route and caller data

    pub fn route(&self) -> &Route {
        &self.route
    }

    pub fn app(&self) -> &str {
        &self.route.app
    }

    /// Resolved handler URI (`app/handler`).
    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// Trailing URI segments the handler path did not consume.
    pub fn params(&self) -> &[String] {
        &self.route.params
    }

    /// Parameters keyed by `names`, or `None` when the counts differ.
    pub fn named_params<'n>(&self, names: &[&'n str]) -> Option<HashMap<&'n str, &str>> {
        if names.len() != self.route.params.len() {
            return None;
        }
        Some(
            names
                .iter()
                .copied()
                .zip(self.route.params.iter().map(String::as_str))
                .collect(),
        )
    }

    /// Payload passed by the caller of an internal dispatch.
    pub fn data(&self) -> &Payload {
        &self.data
    }

    pub fn data_str(&self, key: &str) -> Option<&str> {
        self.data.get(key).and_then(Value::as_str)
    }

    /// True when another handler (or a hook) dispatched this one.
    pub fn is_internal(&self) -> bool {
        self.internal
    }

    /// True when the engine runs from the command line.
    pub fn is_cli(&self) -> bool {
        self.dispatcher.is_cli()
    }

    /// Configuration of the handler's app; empty when it has none.
    pub fn app_config(&self) -> &AppConfig {
        &self.app_config
    }

    /// Engine-level configuration lookup.
    pub fn conf(&self, section: &str, key: &str) -> Option<String> {
        self.dispatcher.config().conf(section, key)
    }

    // Response shape

    pub fn set_cache(&mut self, policy: CachePolicy) {
        self.cache = policy;
    }

    pub fn cache_policy(&self) -> CachePolicy {
        self.cache
    }

    pub fn set_status(&mut self, status: StatusCode) {
        self.status = status;
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn set_header(&mut self, name: HeaderName, value: HeaderValue) {
        self.headers.insert(name, value);
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Output written so far and not yet streamed.
    pub fn output(&self) -> &[u8] {
        &self.buffer
    }

    /// Discard buffered output.
    pub fn clear(&mut self) {
        self.buffer.clear();
    }

    // Streaming

    /// Switch to chunked output (if not already) and send the buffer as one chunk.
    pub fn flush_chunk(&mut self) -> Result<(), StreamError> {
        self.stream_send(Chunk::Flush)
    }

    /// Switch to chunked output (if not already) and send `data` as one chunk.
    /// Buffered output stays buffered.
    pub fn send_chunk(&mut self, data: &[u8]) -> Result<(), StreamError> {
        self.stream_send(Chunk::Data(data))
    }

    /// Send buffered output and terminate the chunked response.
    pub fn end_chunks(&mut self) -> Result<(), StreamError> {
        self.stream_send(Chunk::End)
    }

    /// True once output has started going out in chunks.
    pub fn is_streaming(&self) -> bool {
        self.stream.as_ref().is_some_and(ChunkEncoder::is_started)
    }

    fn stream_send(&mut self, chunk: Chunk<'_>) -> Result<(), StreamError> {
        let encoder = self.stream.as_mut().ok_or(StreamError::Unavailable)?;
        if !encoder.is_started() {
            let head = StreamHead {
                status: self.status,
                headers: self.headers.clone(),
            };
            encoder.start(&head)?;
        }
        encoder.send(chunk, &mut self.buffer)
    }

    /// Terminate the stream if the handler left it open.
    pub(crate) fn finish_stream(&mut self) -> Result<(), StreamError> {
        match self.stream.as_mut() {
            Some(encoder) if encoder.is_started() && !encoder.is_finished() => {
                encoder.send(Chunk::End, &mut self.buffer)
            }
            _ => Ok(()),
        }
    }

    pub(crate) fn into_rendered(self) -> Rendered {
        Rendered {
            status: self.status,
            headers: self.headers,
            body: self.buffer.freeze(),
        }
    }

    // Engine access

    /// Dispatch `uri` internally and return its output.
    ///
    /// A redirect issued by the callee is passed up as an error so the
    /// caller stops as well.
    pub fn run(&self, uri: &str, data: Payload) -> Result<Bytes, HandlerError> {
        let rendered = self.dispatcher.run_with(uri, data, self.request.clone());
        if let Some(location) = rendered.location() {
            return Err(HandlerError::Redirect(location.to_string()));
        }
        Ok(rendered.body)
    }

    /// Fire a hook. Returns false when no hook by that name exists.
    pub fn hook(&self, name: &str, data: &Payload) -> bool {
        self.dispatcher.fire(name, data, self.request.as_ref())
    }

    /// Drop buffered output and build an error for the error handler.
    ///
    /// `return Err(ctx.error(404, "Page not found", ""));`
    pub fn error(&mut self, code: u16, title: &str, message: &str) -> HandlerError {
        self.clear();
        HandlerError::status(code, title, message)
    }

    /// Build a redirect to `url`, absolutized against the current request.
    ///
    /// `return Err(ctx.redirect("/login"));`
    pub fn redirect(&self, url: &str) -> HandlerError {
        HandlerError::Redirect(absolutize(url, None, self.request()))
    }

    /// Redirect to the HTTPS version of this request when it arrived over HTTP.
    pub fn force_https(&self) -> Result<(), HandlerError> {
        match self.request() {
            Some(request) if !request.is_https() => Err(HandlerError::Redirect(format!(
                "https://{}{}",
                request.host(),
                request.request_uri()
            ))),
            _ => Ok(()),
        }
    }

    /// Redirect to the HTTP version of this request when it arrived over HTTPS.
    pub fn force_http(&self) -> Result<(), HandlerError> {
        match self.request() {
            Some(request) if request.is_https() => Err(HandlerError::Redirect(format!(
                "http://{}{}",
                request.host(),
                request.request_uri()
            ))),
            _ => Ok(()),
        }
    }

    // Request helpers

    /// The external request this dispatch serves, if any.
    pub fn request(&self) -> Option<&RequestInfo> {
        self.request.as_deref()
    }

    pub fn is_https(&self) -> bool {
        self.request().is_some_and(RequestInfo::is_https)
    }

    /// Effective request method, honoring `X-HTTP-Method-Override`.
    /// `GET` outside of an HTTP request.
    pub fn request_method(&self) -> Method {
        self.request().map_or(Method::GET, RequestInfo::method)
    }

    /// Raw request body (PUT/POST data).
    pub fn body(&self) -> &[u8] {
        self.request().map_or(&[][..], |r| &r.body()[..])
    }

    pub fn form(&self) -> HashMap<String, String> {
        self.request().map(RequestInfo::form).unwrap_or_default()
    }

    pub fn query(&self) -> HashMap<String, String> {
        self.request().map(RequestInfo::query_pairs).unwrap_or_default()
    }
}

impl io::Write for RequestContext<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.stream.as_ref().is_some_and(ChunkEncoder::is_finished) {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, StreamError::Finished));
        }
        self.buffer.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
