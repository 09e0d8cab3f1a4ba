//! Dispatcher scenarios without the HTTP layer.

use axum::http::StatusCode;
use serde_json::Value;
use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use cascade_dispatch::apps;
use cascade_dispatch::cache::{CachePolicy, MemoryCache, OutputCache};
use cascade_dispatch::config::EngineConfig;
use cascade_dispatch::dispatch::{Dispatcher, Outcome, Payload, RequestContext};
use cascade_dispatch::handler::{HandlerRegistry, HandlerResult};
use cascade_dispatch::streaming::{FrameSink, WireFrames};

fn dispatcher(config: EngineConfig, handlers: HandlerRegistry) -> Dispatcher {
    Dispatcher::new(Arc::new(config), handlers, Arc::new(MemoryCache::new()))
}

fn payload(pairs: &[(&str, &str)]) -> Payload {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), Value::from(*v)))
        .collect()
}

/// Writer shared between a sink and the test.
#[derive(Clone, Default)]
struct Captured(Arc<Mutex<Vec<u8>>>);

impl Write for Captured {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl Captured {
    fn text(&self) -> String {
        String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
    }
}

#[test]
fn test_hooks_run_in_order_with_payload() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let mut handlers = HandlerRegistry::new();
    apps::register(&mut handlers);
    for key in ["audit/log", "search/reindex"] {
        let log = log.clone();
        handlers.register_fn(key, move |ctx: &mut RequestContext<'_>| -> HandlerResult {
            let id = ctx.data_str("id").unwrap_or("?").to_string();
            log.lock().unwrap().push(format!("{}:{id}", ctx.uri()));
            write!(ctx, "discarded")?;
            Ok(())
        });
    }
    handlers.register_fn("blog/save", |ctx: &mut RequestContext<'_>| -> HandlerResult {
        let fired = ctx.hook("on_save", &payload(&[("id", "7")]));
        write!(ctx, "saved:{fired}")?;
        Ok(())
    });

    let mut config = EngineConfig::default();
    config.hooks.insert(
        "on_save".into(),
        vec!["audit/log".into(), "search/reindex".into()],
    );
    let dispatcher = dispatcher(config, handlers);

    let rendered = dispatcher.dispatch("/blog/save", None, None).into_rendered();
    assert_eq!(rendered.text(), "saved:true");
    assert_eq!(
        *log.lock().unwrap(),
        vec!["audit/log:7".to_string(), "search/reindex:7".to_string()]
    );

    assert_eq!(dispatcher.calls().get("audit/log"), 1);
    assert_eq!(dispatcher.calls().get("search/reindex"), 1);
    assert!(!dispatcher.hook("missing", &Payload::new()));
}

#[test]
fn test_cached_output_skips_handler() {
    let runs = Arc::new(AtomicUsize::new(0));
    let mut handlers = HandlerRegistry::new();
    let counter = runs.clone();
    handlers.register_fn("blog/post", move |ctx: &mut RequestContext<'_>| -> HandlerResult {
        let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
        ctx.set_cache(CachePolicy::Forever);
        write!(ctx, "render {n}")?;
        Ok(())
    });
    let dispatcher = dispatcher(EngineConfig::default(), handlers);

    for _ in 0..3 {
        let rendered = dispatcher.dispatch("/blog/post", None, None).into_rendered();
        assert_eq!(rendered.text(), "render 1");
    }
    assert_eq!(runs.load(Ordering::SeqCst), 1);
    assert_eq!(dispatcher.cache().get("blog_post").as_deref(), Some(&b"render 1"[..]));

    // Params are not part of the key.
    let rendered = dispatcher.dispatch("/blog/post/other", None, None).into_rendered();
    assert_eq!(rendered.text(), "render 1");

    assert!(dispatcher.cache().delete("blog_post"));
    let rendered = dispatcher.dispatch("/blog/post", None, None).into_rendered();
    assert_eq!(rendered.text(), "render 2");
}

#[test]
fn test_huge_ttl_is_cached_without_expiry() {
    let runs = Arc::new(AtomicUsize::new(0));
    let mut handlers = HandlerRegistry::new();
    let counter = runs.clone();
    handlers.register_fn("blog/archive", move |ctx: &mut RequestContext<'_>| -> HandlerResult {
        counter.fetch_add(1, Ordering::SeqCst);
        ctx.set_cache(CachePolicy::seconds(u64::MAX));
        write!(ctx, "archive")?;
        Ok(())
    });
    let dispatcher = dispatcher(EngineConfig::default(), handlers);

    for _ in 0..2 {
        let rendered = dispatcher.dispatch("/blog/archive", None, None).into_rendered();
        assert_eq!(rendered.status, StatusCode::OK);
        assert_eq!(rendered.text(), "archive");
    }
    assert_eq!(runs.load(Ordering::SeqCst), 1);
    assert_eq!(dispatcher.cache().purge_expired(), 0);
}

#[test]
fn test_short_ttl_expires_and_reruns() {
    let runs = Arc::new(AtomicUsize::new(0));
    let mut handlers = HandlerRegistry::new();
    let counter = runs.clone();
    handlers.register_fn("blog/latest", move |ctx: &mut RequestContext<'_>| -> HandlerResult {
        let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
        ctx.set_cache(CachePolicy::Ttl(Duration::from_millis(30)));
        write!(ctx, "render {n}")?;
        Ok(())
    });
    let dispatcher = dispatcher(EngineConfig::default(), handlers);

    assert_eq!(dispatcher.dispatch("/blog/latest", None, None).into_rendered().text(), "render 1");
    assert_eq!(dispatcher.dispatch("/blog/latest", None, None).into_rendered().text(), "render 1");

    std::thread::sleep(Duration::from_millis(60));
    assert_eq!(dispatcher.dispatch("/blog/latest", None, None).into_rendered().text(), "render 2");
    assert_eq!(runs.load(Ordering::SeqCst), 2);
}

#[test]
fn test_cache_disabled_globally() {
    let runs = Arc::new(AtomicUsize::new(0));
    let mut handlers = HandlerRegistry::new();
    let counter = runs.clone();
    handlers.register_fn("blog/post", move |ctx: &mut RequestContext<'_>| -> HandlerResult {
        counter.fetch_add(1, Ordering::SeqCst);
        ctx.set_cache(CachePolicy::Forever);
        Ok(())
    });
    let mut config = EngineConfig::default();
    config.cache.enabled = false;
    let dispatcher = dispatcher(config, handlers);

    dispatcher.dispatch("/blog/post", None, None);
    dispatcher.dispatch("/blog/post", None, None);
    assert_eq!(runs.load(Ordering::SeqCst), 2);
    assert!(dispatcher.cache().is_empty());
}

#[test]
fn test_resolution_cascade() {
    let mut handlers = HandlerRegistry::new();
    apps::register(&mut handlers);
    handlers.register_fn("app/a", |ctx: &mut RequestContext<'_>| -> HandlerResult {
        let params = ctx.params().join(",");
        write!(ctx, "{params}")?;
        Ok(())
    });
    let dispatcher = dispatcher(EngineConfig::default(), handlers);

    let route = dispatcher.resolve("/app/a/b/c");
    assert_eq!(route.uri(), "app/a");
    assert_eq!(route.params, vec!["b", "c"]);

    let rendered = dispatcher.dispatch("/app/a/b/c", None, None).into_rendered();
    assert_eq!(rendered.text(), "b,c");

    let traversal = dispatcher.dispatch("/app/../../etc/passwd", None, None).into_rendered();
    let home = dispatcher.dispatch("/", None, None).into_rendered();
    assert_eq!(traversal.status, StatusCode::OK);
    assert_eq!(traversal.body, home.body);
}

#[test]
fn test_error_page_and_fallback() {
    let mut handlers = HandlerRegistry::new();
    apps::register(&mut handlers);
    let dispatcher = dispatcher(EngineConfig::default(), handlers);

    let rendered = dispatcher.error(403, "Forbidden", "No <entry>");
    assert_eq!(rendered.status, StatusCode::FORBIDDEN);
    assert!(rendered.text().contains("<h1>Forbidden</h1>"));
    assert!(rendered.text().contains("No &lt;entry&gt;"));

    // Without an error handler the status line is the body.
    let mut handlers = HandlerRegistry::new();
    handlers.register_fn("main/index", |_ctx: &mut RequestContext<'_>| -> HandlerResult { Ok(()) });
    let bare = dispatcher_with(handlers);
    let rendered = bare.error(404, "Page not found", "");
    assert_eq!(rendered.status, StatusCode::NOT_FOUND);
    assert_eq!(rendered.text(), "404 Page not found");
}

fn dispatcher_with(handlers: HandlerRegistry) -> Dispatcher {
    dispatcher(EngineConfig::default(), handlers)
}

#[test]
fn test_failing_error_handler_falls_back() {
    let mut handlers = HandlerRegistry::new();
    handlers.register_fn("main/index", |ctx: &mut RequestContext<'_>| -> HandlerResult {
        Err(ctx.error(418, "Teapot", ""))
    });
    handlers.register_fn("main/error", |ctx: &mut RequestContext<'_>| -> HandlerResult {
        Err(ctx.error(500, "Broken", ""))
    });
    let dispatcher = dispatcher_with(handlers);

    let rendered = dispatcher.dispatch("/", None, None).into_rendered();
    assert_eq!(rendered.status, StatusCode::IM_A_TEAPOT);
    assert_eq!(rendered.text(), "500 Broken");
}

#[test]
fn test_streamed_output_is_not_cached() {
    let mut handlers = HandlerRegistry::new();
    handlers.register_fn("feed/live", |ctx: &mut RequestContext<'_>| -> HandlerResult {
        ctx.set_cache(CachePolicy::Forever);
        write!(ctx, "hi")?;
        ctx.flush_chunk()?;
        Ok(())
    });
    let dispatcher = dispatcher_with(handlers);

    let out = Captured::default();
    let sink: Box<dyn FrameSink> = Box::new(WireFrames::new(out.clone()));
    let outcome = dispatcher.dispatch("/feed/live", None, Some(sink));
    assert!(matches!(outcome, Outcome::Streamed));
    assert_eq!(out.text(), "2\r\nhi\r\n0\r\n\r\n");
    assert!(dispatcher.cache().is_empty());

    // Internal runs cannot stream; the handler's error becomes a 500 page.
    let rendered = dispatcher.run("feed/live", Payload::new());
    assert_eq!(rendered.status, StatusCode::INTERNAL_SERVER_ERROR);
}

#[test]
fn test_panicking_handler_is_contained() {
    let mut handlers = HandlerRegistry::new();
    apps::register(&mut handlers);
    handlers.register_fn("main/boom", |ctx: &mut RequestContext<'_>| -> HandlerResult {
        write!(ctx, "partial")?;
        panic!("handler exploded");
    });
    let dispatcher = dispatcher(EngineConfig::default(), handlers);

    let rendered = dispatcher.dispatch("/main/boom", None, None).into_rendered();
    assert_eq!(rendered.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(rendered.text().contains("Internal Server Error"));
    assert!(!rendered.text().contains("partial"));

    // The engine keeps serving.
    let rendered = dispatcher.dispatch("/", None, None).into_rendered();
    assert_eq!(rendered.status, StatusCode::OK);
}

#[test]
fn test_nested_run_returns_output() {
    let mut handlers = HandlerRegistry::new();
    apps::register(&mut handlers);
    handlers
        .register_fn("blog/sidebar", |ctx: &mut RequestContext<'_>| -> HandlerResult {
            let who = ctx.data_str("who").unwrap_or("nobody").to_string();
            write!(ctx, "[sidebar for {who}]")?;
            Ok(())
        })
        .register_fn("blog/page", |ctx: &mut RequestContext<'_>| -> HandlerResult {
            let sidebar = ctx.run("blog/sidebar", payload(&[("who", "ada")]))?;
            write!(ctx, "page ")?;
            ctx.write_all(&sidebar)?;
            Ok(())
        });
    let dispatcher = dispatcher(EngineConfig::default(), handlers);

    let rendered = dispatcher.dispatch("/blog/page", None, None).into_rendered();
    assert_eq!(rendered.text(), "page [sidebar for ada]");
    assert_eq!(dispatcher.calls().get("blog/sidebar"), 1);
    assert_eq!(dispatcher.calls().get("blog/page"), 0);
}
