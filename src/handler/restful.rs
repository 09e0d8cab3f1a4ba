//! RESTful action dispatch for API handlers.
//!
//! A `Restful` registered at `myapp/api` turns `POST /myapp/api/hello/Ada`
//! into a call of its `(POST, "hello")` action with arguments `["Ada"]`.
//! Results are wrapped in a JSON envelope:
//!
//! ```text
//! {"success": true,  "data": <value>}
//! {"success": false, "error": "<message>"}
//! ```
//!
//! Failure details never reach the client; they are logged instead.

use axum::http::{header, HeaderValue, Method, StatusCode};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::fmt;

use crate::dispatch::RequestContext;
use crate::handler::{Handler, HandlerError, HandlerResult};

pub const NO_ACTION: &str = "No action specified";
pub const INVALID_ACTION: &str = "Invalid action name";
pub const MISSING_ARGUMENT: &str = "Missing required argument";
pub const UNEXPECTED_ERROR: &str = "Unexpected error occurred";

type Action =
    Box<dyn Fn(&mut RequestContext<'_>, &[String]) -> Result<Value, HandlerError> + Send + Sync>;

/// Actions keyed by request method and name.
#[derive(Default)]
pub struct Restful {
    actions: HashMap<(Method, String), Action>,
}

impl Restful {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an action. Returning `Value::Null` writes no envelope, leaving the
    /// response body to the action.
    pub fn action<F>(mut self, method: Method, name: &str, f: F) -> Self
    where
        F: Fn(&mut RequestContext<'_>, &[String]) -> Result<Value, HandlerError>
            + Send
            + Sync
            + 'static,
    {
        self.actions.insert((method, name.to_string()), Box::new(f));
        self
    }

    pub fn get<F>(self, name: &str, f: F) -> Self
    where
        F: Fn(&mut RequestContext<'_>, &[String]) -> Result<Value, HandlerError>
            + Send
            + Sync
            + 'static,
    {
        self.action(Method::GET, name, f)
    }

    pub fn post<F>(self, name: &str, f: F) -> Self
    where
        F: Fn(&mut RequestContext<'_>, &[String]) -> Result<Value, HandlerError>
            + Send
            + Sync
            + 'static,
    {
        self.action(Method::POST, name, f)
    }

    pub fn has_action(&self, method: &Method, name: &str) -> bool {
        self.actions.contains_key(&(method.clone(), name.to_string()))
    }
}

impl Handler for Restful {
    fn call(&self, ctx: &mut RequestContext<'_>) -> HandlerResult {
        ctx.set_header(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let params = ctx.params().to_vec();
        let Some((name, args)) = params.split_first() else {
            return reject(ctx, StatusCode::BAD_REQUEST, NO_ACTION);
        };

        let method = ctx.request_method();
        let Some(action) = self.actions.get(&(method.clone(), name.clone())) else {
            tracing::debug!(uri = %ctx.uri(), method = %method, action = %name, "Unknown action");
            return reject(ctx, StatusCode::BAD_REQUEST, INVALID_ACTION);
        };

        match action(ctx, args) {
            Ok(Value::Null) => Ok(()),
            Ok(data) => write_json(ctx, &json!({ "success": true, "data": data })),
            Err(HandlerError::MissingArgument) => {
                reject(ctx, StatusCode::BAD_REQUEST, MISSING_ARGUMENT)
            }
            Err(err @ (HandlerError::Redirect(_) | HandlerError::Status(_))) => Err(err),
            Err(err) => {
                tracing::warn!(uri = %ctx.uri(), action = %name, error = %err, "Action failed");
                reject(ctx, StatusCode::INTERNAL_SERVER_ERROR, UNEXPECTED_ERROR)
            }
        }
    }
}

impl fmt::Debug for Restful {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut actions: Vec<String> = self
            .actions
            .keys()
            .map(|(method, name)| format!("{method} {name}"))
            .collect();
        actions.sort();
        f.debug_struct("Restful").field("actions", &actions).finish()
    }
}

/// Argument `index`, or [`HandlerError::MissingArgument`].
pub fn arg(args: &[String], index: usize) -> Result<&str, HandlerError> {
    args.get(index)
        .map(String::as_str)
        .ok_or(HandlerError::MissingArgument)
}

fn reject(ctx: &mut RequestContext<'_>, status: StatusCode, message: &str) -> HandlerResult {
    ctx.clear();
    ctx.set_status(status);
    write_json(ctx, &json!({ "success": false, "error": message }))
}

fn write_json(ctx: &mut RequestContext<'_>, value: &Value) -> HandlerResult {
    serde_json::to_writer(&mut *ctx, value)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;
    use crate::config::EngineConfig;
    use crate::dispatch::Dispatcher;
    use crate::handler::HandlerRegistry;
    use crate::http::request::{RequestInfo, X_HTTP_METHOD_OVERRIDE};
    use axum::http::{HeaderName, Uri};
    use std::io::Write;
    use std::sync::Arc;

    fn api() -> Restful {
        Restful::new()
            .get("hello", |_ctx, args| {
                let name = arg(args, 0)?;
                Ok(Value::from(format!("Hello, {name}")))
            })
            .post("echo", |ctx, _args| Ok(Value::from(String::from_utf8_lossy(ctx.body()).into_owned())))
            .get("boom", |_ctx, _args| Err(HandlerError::internal("database offline")))
            .get("raw", |ctx, _args| {
                write!(ctx, "plain")?;
                Ok(Value::Null)
            })
    }

    fn dispatcher() -> Dispatcher {
        let mut handlers = HandlerRegistry::new();
        handlers.register("myapp/api", api());
        handlers.register_fn("main/index", |_ctx: &mut RequestContext<'_>| Ok(()));
        Dispatcher::new(
            Arc::new(EngineConfig::default()),
            handlers,
            Arc::new(MemoryCache::new()),
        )
    }

    fn body(dispatcher: &Dispatcher, uri: &str) -> (StatusCode, Value) {
        let rendered = dispatcher.run(uri, Default::default());
        (rendered.status, serde_json::from_slice(&rendered.body).unwrap())
    }

    #[test]
    fn test_success_envelope() {
        let dispatcher = dispatcher();
        let rendered = dispatcher.run("myapp/api/hello/Ada", Default::default());
        assert_eq!(rendered.headers[header::CONTENT_TYPE], "application/json");

        let (status, value) = body(&dispatcher, "myapp/api/hello/Ada");
        assert_eq!(status, StatusCode::OK);
        assert_eq!(value, json!({ "success": true, "data": "Hello, Ada" }));
    }

    #[test]
    fn test_client_errors() {
        let dispatcher = dispatcher();
        assert_eq!(
            body(&dispatcher, "myapp/api"),
            (StatusCode::BAD_REQUEST, json!({ "success": false, "error": NO_ACTION }))
        );
        assert_eq!(
            body(&dispatcher, "myapp/api/nope"),
            (StatusCode::BAD_REQUEST, json!({ "success": false, "error": INVALID_ACTION }))
        );
        assert_eq!(
            body(&dispatcher, "myapp/api/hello"),
            (StatusCode::BAD_REQUEST, json!({ "success": false, "error": MISSING_ARGUMENT }))
        );
    }

    #[test]
    fn test_internal_detail_is_hidden() {
        let dispatcher = dispatcher();
        let rendered = dispatcher.run("myapp/api/boom", Default::default());
        assert_eq!(rendered.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!rendered.text().contains("database"));
        assert_eq!(
            serde_json::from_slice::<Value>(&rendered.body).unwrap(),
            json!({ "success": false, "error": UNEXPECTED_ERROR })
        );
    }

    #[test]
    fn test_null_result_writes_nothing() {
        let dispatcher = dispatcher();
        assert_eq!(dispatcher.run("myapp/api/raw", Default::default()).text(), "plain");
    }

    #[test]
    fn test_action_selected_by_effective_method() {
        let dispatcher = dispatcher();
        let request = RequestInfo::new(Method::GET, Uri::from_static("/myapp/api/echo"))
            .with_header(
                HeaderName::from_static(X_HTTP_METHOD_OVERRIDE),
                HeaderValue::from_static("POST"),
            )
            .with_body("ping");

        let rendered = dispatcher
            .dispatch("/myapp/api/echo", Some(Arc::new(request)), None)
            .into_rendered();
        assert_eq!(
            serde_json::from_slice::<Value>(&rendered.body).unwrap(),
            json!({ "success": true, "data": "ping" })
        );
    }
}
