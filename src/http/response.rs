//! Response building.
//!
//! # Responsibilities
//! - Turn buffered dispatch results into axum responses
//! - Build absolute URLs for `Location` headers
//!
//! # Design Decisions
//! - Streamed results never pass through here; the server wires them to a
//!   channel-backed body as soon as the handler starts streaming

use axum::body::Body;
use axum::http::header;
use axum::response::{IntoResponse, Response};

use crate::dispatch::Rendered;
use crate::http::request::RequestInfo;

impl IntoResponse for Rendered {
    fn into_response(self) -> Response {
        let mut response = Response::new(Body::from(self.body));
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        response
    }
}

/// Turn `url` into an absolute URL.
///
/// - `scheme://...` is returned unchanged
/// - `//host/path` gets the request's scheme
/// - `/path` is appended to `base`
/// - anything else is joined to `base` with a single `/`
///
/// Without a `base`, scheme and host of the current request are used
/// (`http://localhost` outside of a request).
pub fn absolutize(url: &str, base: Option<&str>, request: Option<&RequestInfo>) -> String {
    if url.contains("://") {
        return url.to_string();
    }

    let scheme = request.map_or("http", RequestInfo::scheme);
    if url.starts_with("//") {
        return format!("{scheme}:{url}");
    }

    let base = match base {
        Some(base) => base.to_string(),
        None => format!("{scheme}://{}", request.map_or("localhost", RequestInfo::host)),
    };

    if url.starts_with('/') || base.ends_with('/') {
        format!("{base}{url}")
    } else {
        format!("{base}/{url}")
    }
}

/// Headers for plain text fallback bodies.
pub(crate) fn plain_text_headers() -> axum::http::HeaderMap {
    let mut headers = axum::http::HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        header::HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    headers
}
