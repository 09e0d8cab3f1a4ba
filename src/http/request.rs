//! Request snapshot handed to the dispatcher.
//!
//! # Responsibilities
//! - Capture method, URI, headers and the (already read) body once
//! - Apply `X-HTTP-Method-Override` on top of the wire method
//! - Decide whether the request arrived over HTTPS
//! - Decode query strings and urlencoded forms
//!
//! # Design Decisions
//! - The body is read fully before dispatch; handlers see it as bytes and
//!   can read it any number of times
//! - TLS terminates in front of the engine, so HTTPS is only detected from
//!   the URI scheme or a trusted `X-Forwarded-Proto`

use axum::http::{header, request::Parts, HeaderMap, HeaderName, HeaderValue, Method, Uri};
use bytes::Bytes;
use std::collections::HashMap;

pub const X_HTTP_METHOD_OVERRIDE: &str = "x-http-method-override";
pub const X_FORWARDED_PROTO: &str = "x-forwarded-proto";
pub const X_REQUEST_ID: &str = "x-request-id";

/// An external request as seen by handlers.
#[derive(Debug, Clone)]
pub struct RequestInfo {
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
    https: bool,
}

impl RequestInfo {
    pub fn new(method: Method, uri: Uri) -> Self {
        let https = uri.scheme_str() == Some("https");
        Self {
            method,
            uri,
            headers: HeaderMap::new(),
            body: Bytes::new(),
            https,
        }
    }

    /// Build from the parts of an incoming request and its collected body.
    pub fn from_parts(parts: &Parts, body: Bytes, trust_forwarded_proto: bool) -> Self {
        let forwarded_https = trust_forwarded_proto
            && parts
                .headers
                .get(X_FORWARDED_PROTO)
                .and_then(|v| v.to_str().ok())
                .is_some_and(|proto| proto.trim().eq_ignore_ascii_case("https"));

        let mut info = Self::new(parts.method.clone(), parts.uri.clone());
        info.headers = parts.headers.clone();
        info.body = body;
        info.https |= forwarded_https;
        info
    }

    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    pub fn with_https(mut self, https: bool) -> Self {
        self.https = https;
        self
    }

    /// Effective method: the override header when present and valid,
    /// otherwise the wire method.
    pub fn method(&self) -> Method {
        self.headers
            .get(X_HTTP_METHOD_OVERRIDE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.trim().to_ascii_uppercase())
            .filter(|v| !v.is_empty())
            .and_then(|v| Method::from_bytes(v.as_bytes()).ok())
            .unwrap_or_else(|| self.method.clone())
    }

    /// Method as sent on the wire.
    pub fn actual_method(&self) -> &Method {
        &self.method
    }

    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Host the client addressed, `localhost` when unknown.
    pub fn host(&self) -> &str {
        self.header(header::HOST.as_str())
            .or_else(|| self.uri.authority().map(|a| a.as_str()))
            .unwrap_or("localhost")
    }

    /// Path plus query string, as requested.
    pub fn request_uri(&self) -> &str {
        self.uri
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or("/")
    }

    pub fn path(&self) -> &str {
        self.uri.path()
    }

    pub fn query(&self) -> Option<&str> {
        self.uri.query()
    }

    /// Decoded query string pairs. Later duplicates win.
    pub fn query_pairs(&self) -> HashMap<String, String> {
        self.uri
            .query()
            .map(|q| url::form_urlencoded::parse(q.as_bytes()).into_owned().collect())
            .unwrap_or_default()
    }

    /// Raw request body (PUT/POST data).
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Decoded `application/x-www-form-urlencoded` body, empty for other types.
    pub fn form(&self) -> HashMap<String, String> {
        let is_form = self
            .header(header::CONTENT_TYPE.as_str())
            .is_some_and(|ct| ct.starts_with("application/x-www-form-urlencoded"));
        if !is_form {
            return HashMap::new();
        }
        url::form_urlencoded::parse(&self.body).into_owned().collect()
    }

    pub fn is_https(&self) -> bool {
        self.https
    }

    pub fn scheme(&self) -> &'static str {
        if self.https {
            "https"
        } else {
            "http"
        }
    }

    pub fn request_id(&self) -> Option<&str> {
        self.header(X_REQUEST_ID)
    }
}
