use axum::http::{header, HeaderValue};
use std::io::Write;

use crate::apps::escape_html;
use crate::dispatch::RequestContext;
use crate::handler::{HandlerRegistry, HandlerResult};

pub fn register(handlers: &mut HandlerRegistry) {
    handlers
        .register_fn("main/index", index)
        .register_fn("main/error", error);
}

fn html(ctx: &mut RequestContext<'_>) {
    ctx.set_header(header::CONTENT_TYPE, HeaderValue::from_static("text/html; charset=utf-8"));
}

fn index(ctx: &mut RequestContext<'_>) -> HandlerResult {
    if !ctx.params().is_empty() {
        let path = ctx.params().join("/");
        return Err(ctx.error(404, "Page not found", &format!("Nothing lives at /{path}")));
    }

    html(ctx);
    write!(
        ctx,
        "<!DOCTYPE html>\n<html><head><title>Welcome</title></head>\
         <body><h1>Welcome</h1><p>The dispatcher is up.</p></body></html>\n"
    )?;
    Ok(())
}

fn error(ctx: &mut RequestContext<'_>) -> HandlerResult {
    let code = ctx.data().get("code").and_then(|v| v.as_u64()).unwrap_or(500);
    let title = escape_html(ctx.data_str("title").unwrap_or("Error"));
    let message = escape_html(ctx.data_str("message").unwrap_or(""));

    html(ctx);
    write!(
        ctx,
        "<!DOCTYPE html>\n<html><head><title>{code} {title}</title></head>\
         <body><h1>{title}</h1>"
    )?;
    if !message.is_empty() {
        write!(ctx, "<p>{message}</p>")?;
    }
    writeln!(ctx, "</body></html>")?;
    Ok(())
}
