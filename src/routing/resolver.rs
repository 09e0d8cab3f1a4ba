//! Cascading URI resolution.
//!
//! # Responsibilities
//! - Reject traversal attempts and map `/` to the default handler
//! - Expand a bare app name to `<app>/index`
//! - Peel trailing segments off the handler path until a handler exists,
//!   turning each peeled segment into a positional parameter
//! - Fall back to `<app>/index`, then to the default handler
//!
//! # Design Decisions
//! - Pure function of (uri, handler table): no I/O, no side effects
//! - Bounded by the number of `/` separators in the input
//! - Never fails: every URI resolves to some route

use std::collections::VecDeque;

use crate::routing::lookup::{route_key, HandlerLookup};

/// Handler name an app falls back to.
pub const INDEX_HANDLER: &str = "index";

/// The result of resolving a URI.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Route {
    /// App owning the handler.
    pub app: String,
    /// Handler path inside the app, without extension (e.g. `posts/view`).
    pub handler: String,
    /// Unmatched trailing URI segments, in URI order.
    pub params: Vec<String>,
}

impl Route {
    pub fn new(app: impl Into<String>, handler: impl Into<String>, params: Vec<String>) -> Self {
        Self {
            app: app.into(),
            handler: handler.into(),
            params,
        }
    }

    /// The handler URI, `app/handler`.
    pub fn uri(&self) -> String {
        route_key(&self.app, &self.handler)
    }
}

/// Resolves URIs to routes against a handler table.
#[derive(Debug, Clone)]
pub struct PathResolver {
    default_handler: String,
}

impl PathResolver {
    /// Create a resolver falling back to `default_handler` (`app/handler`).
    pub fn new(default_handler: impl Into<String>) -> Self {
        Self {
            default_handler: default_handler.into(),
        }
    }

    pub fn default_handler(&self) -> &str {
        &self.default_handler
    }

    /// Resolve `uri` to a route.
    pub fn resolve<L>(&self, uri: &str, lookup: &L) -> Route
    where
        L: HandlerLookup + ?Sized,
    {
        let default = self.default_handler.trim_start_matches('/');
        let mut params = VecDeque::new();

        let uri = strip_query(uri);
        let uri = if !is_clean(uri) || uri == "/" { default } else { uri };
        let uri = uri.trim_start_matches('/');

        let uri = if uri.contains('/') {
            uri.to_string()
        } else if lookup.contains(uri, INDEX_HANDLER) {
            route_key(uri, INDEX_HANDLER)
        } else {
            params.push_front(uri.to_string());
            default.to_string()
        };

        let (app, tail) = split_route(&uri);
        let mut handler = tail.to_string();
        loop {
            if lookup.contains(app, &handler) {
                return Route::new(app, handler, params.into());
            }
            match handler.rfind('/') {
                Some(pos) => {
                    params.push_front(handler[pos + 1..].to_string());
                    handler.truncate(pos);
                }
                None => {
                    params.push_front(std::mem::take(&mut handler));
                    break;
                }
            }
        }

        if lookup.contains(app, INDEX_HANDLER) {
            return Route::new(app, INDEX_HANDLER, params.into());
        }

        tracing::debug!(uri = %uri, default = %default, "No handler matched, using default handler");
        let (app, handler) = split_route(default);
        Route::new(app, handler, params.into())
    }
}

/// Is this URI free of directory manipulation attempts?
pub fn is_clean(uri: &str) -> bool {
    !uri.contains("..")
}

/// Drop everything from the first `?` or `#`.
fn strip_query(uri: &str) -> &str {
    match uri.find(|c| c == '?' || c == '#') {
        Some(pos) => &uri[..pos],
        None => uri,
    }
}

/// Split `app/handler` on the first `/`. A bare name means its index handler.
fn split_route(uri: &str) -> (&str, &str) {
    uri.split_once('/').unwrap_or((uri, INDEX_HANDLER))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn table(keys: &[&str]) -> HashSet<String> {
        keys.iter().map(|k| k.to_string()).collect()
    }

    fn params(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    fn resolver() -> PathResolver {
        PathResolver::new("main/index")
    }

    #[test]
    fn test_exact_match() {
        let handlers = table(&["main/index", "blog/post"]);
        let route = resolver().resolve("/blog/post", &handlers);
        assert_eq!(route, Route::new("blog", "post", vec![]));
        assert_eq!(route.uri(), "blog/post");
    }

    #[test]
    fn test_cascade_collects_params_in_order() {
        let handlers = table(&["main/index", "app/a"]);
        let route = resolver().resolve("/app/a/b/c", &handlers);
        assert_eq!(route, Route::new("app", "a", params(&["b", "c"])));
    }

    #[test]
    fn test_cascade_prefers_longest_handler() {
        let handlers = table(&["main/index", "app/a", "app/a/b"]);
        let route = resolver().resolve("app/a/b/c", &handlers);
        assert_eq!(route, Route::new("app", "a/b", params(&["c"])));
    }

    #[test]
    fn test_query_and_fragment_stripped() {
        let handlers = table(&["main/index", "blog/post"]);
        let route = resolver().resolve("/blog/post/42?page=2#comments", &handlers);
        assert_eq!(route, Route::new("blog", "post", params(&["42"])));

        let route = resolver().resolve("/blog/post#top", &handlers);
        assert_eq!(route, Route::new("blog", "post", vec![]));
    }

    #[test]
    fn test_traversal_resolves_like_default() {
        let handlers = table(&["main/index", "blog/post"]);
        let default = resolver().resolve("main/index", &handlers);
        for uri in ["/../etc/passwd", "/blog/../../secret", "..", "/blog/post/..x"] {
            assert_eq!(resolver().resolve(uri, &handlers), default, "uri: {uri}");
        }
    }

    #[test]
    fn test_root_is_default() {
        let handlers = table(&["main/index"]);
        assert_eq!(resolver().resolve("/", &handlers), Route::new("main", "index", vec![]));
    }

    #[test]
    fn test_bare_app_with_index() {
        let handlers = table(&["main/index", "blog/index"]);
        assert_eq!(resolver().resolve("/blog", &handlers), Route::new("blog", "index", vec![]));
    }

    #[test]
    fn test_bare_name_without_index_becomes_param() {
        let handlers = table(&["main/index"]);
        assert_eq!(
            resolver().resolve("/about", &handlers),
            Route::new("main", "index", params(&["about"]))
        );
    }

    #[test]
    fn test_floor_falls_back_to_app_index() {
        let handlers = table(&["main/index", "blog/index"]);
        assert_eq!(
            resolver().resolve("/blog/2024/hello", &handlers),
            Route::new("blog", "index", params(&["2024", "hello"]))
        );
    }

    #[test]
    fn test_floor_falls_back_to_default() {
        let handlers = table(&["main/index"]);
        assert_eq!(
            resolver().resolve("/shop/cart/7", &handlers),
            Route::new("main", "index", params(&["cart", "7"]))
        );
    }

    #[test]
    fn test_trailing_slash_yields_empty_param() {
        let handlers = table(&["main/index", "blog/post"]);
        assert_eq!(
            resolver().resolve("/blog/post/", &handlers),
            Route::new("blog", "post", params(&[""]))
        );
    }

    #[test]
    fn test_empty_app_name() {
        let handlers = table(&["main/index"]);
        assert_eq!(
            resolver().resolve("", &handlers),
            Route::new("main", "index", params(&[""]))
        );
    }

    #[test]
    fn test_resolution_is_idempotent() {
        let handlers = table(&["main/index", "app/a", "blog/index"]);
        for uri in ["/app/a/b/c", "/blog", "/x/y/z", "/", "/../x"] {
            let first = resolver().resolve(uri, &handlers);
            let second = resolver().resolve(uri, &handlers);
            assert_eq!(first, second);
        }
    }

    #[test]
    fn test_is_clean() {
        assert!(is_clean("/blog/post"));
        assert!(!is_clean("/blog/../post"));
    }
}
