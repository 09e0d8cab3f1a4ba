use serde_json::Value;
use std::io::Write;

use crate::dispatch::RequestContext;
use crate::handler::restful::arg;
use crate::handler::{HandlerError, HandlerRegistry, HandlerResult, Restful};

pub fn register(handlers: &mut HandlerRegistry) {
    handlers
        .register("myapp/api", api())
        .register_fn("myapp/stream", stream);
}

/// `GET /myapp/api/hello/{name}` and `POST /myapp/api/hello` (form field `name`).
pub fn api() -> Restful {
    Restful::new()
        .get("hello", |_ctx, args| {
            let name = arg(args, 0)?;
            Ok(greeting(name))
        })
        .post("hello", |ctx, args| {
            let form = ctx.form();
            let name = match form.get("name") {
                Some(name) => name.as_str(),
                None => arg(args, 0)?,
            };
            Ok(greeting(name))
        })
}

fn greeting(name: &str) -> Value {
    Value::from(format!("Hello, {name}"))
}

/// `GET /myapp/stream/{count}`: one line per chunk.
fn stream(ctx: &mut RequestContext<'_>) -> HandlerResult {
    let count = match ctx.params().first() {
        Some(raw) => raw
            .parse::<u32>()
            .map_err(|_| HandlerError::status(400, "Bad Request", "count must be a number"))?,
        None => 3,
    };

    if ctx.is_internal() {
        for i in 1..=count {
            writeln!(ctx, "line {i}")?;
        }
        return Ok(());
    }

    for i in 1..=count {
        writeln!(ctx, "line {i}")?;
        ctx.flush_chunk()?;
    }
    ctx.end_chunks()?;
    Ok(())
}
