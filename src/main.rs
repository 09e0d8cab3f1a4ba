//! cascade-dispatch
//!
//! Serves registered handlers over HTTP, or dispatches a single URI from
//! the command line.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ──────────────▶ http server ──▶ dispatcher ──▶ resolver (cascade)
//!                     (axum, tower)       │
//!                                         ├──▶ output cache
//!                                         ├──▶ app config (once per app)
//!                                         ├──▶ handler ──▶ run / hook (nested dispatch)
//!                                         │
//!     Client Response                     ▼
//!     ◀────────────── buffered body  or  chunked frames
//!
//!     Cross-cutting: config, observability (tracing, metrics),
//!                    lifecycle (signals, shutdown), admin API
//! ```

use clap::Parser;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;

use cascade_dispatch::admin::setup_admin_router;
use cascade_dispatch::apps;
use cascade_dispatch::cache::{MemoryCache, OutputCache};
use cascade_dispatch::config::{load_config, EngineConfig};
use cascade_dispatch::dispatch::{Dispatcher, Outcome};
use cascade_dispatch::handler::HandlerRegistry;
use cascade_dispatch::http::HttpServer;
use cascade_dispatch::lifecycle::{shutdown, spawn_signal_listener, Shutdown};
use cascade_dispatch::observability::{logging, metrics};
use cascade_dispatch::streaming::{FrameSink, WireFrames};

#[derive(Parser)]
#[command(name = "cascade-dispatch")]
#[command(version, about = "Cascading request dispatch engine", long_about = None)]
struct Args {
    /// Engine configuration file (TOML). Defaults apply when it does not exist.
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Dispatch this URI once, write the output to stdout and exit.
    #[arg(long, value_name = "URI")]
    run: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let (config, from_file) = if args.config.exists() {
        (load_config(&args.config)?, true)
    } else {
        (EngineConfig::default(), false)
    };

    logging::init_logging(&config.observability, args.run.is_some());
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %args.config.display(),
        from_file,
        "cascade-dispatch starting"
    );

    let config = Arc::new(config);
    let mut handlers = HandlerRegistry::new();
    apps::register(&mut handlers);
    tracing::info!(
        handlers = handlers.len(),
        hooks = config.hooks.len(),
        default_handler = %config.general.default_handler,
        "Handlers registered"
    );

    if let Some(uri) = args.run {
        return run_once(config, handlers, &uri);
    }

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(e) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    let shutdown = Shutdown::new();
    spawn_signal_listener(shutdown.clone());

    let server = HttpServer::new(config.clone(), handlers);

    if config.admin.enabled {
        let admin = setup_admin_router(server.state());
        let listener = TcpListener::bind(&config.admin.bind_address).await?;
        tracing::info!(address = %listener.local_addr()?, "Admin API listening");
        let admin_shutdown = shutdown.subscribe();
        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, admin)
                .with_graceful_shutdown(shutdown::wait(admin_shutdown))
                .await
            {
                tracing::error!(error = %e, "Admin API failed");
            }
        });
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(
        address = %listener.local_addr()?,
        max_connections = config.listener.max_connections,
        request_timeout_secs = config.timeouts.request_secs,
        "Listening for connections"
    );

    server.run(listener, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

/// Command-line dispatch: streamed output keeps its chunk framing.
fn run_once(
    config: Arc<EngineConfig>,
    handlers: HandlerRegistry,
    uri: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let cache: Arc<dyn OutputCache> = Arc::new(MemoryCache::new());
    let dispatcher = Dispatcher::new(config, handlers, cache).with_cli(true);

    let sink: Box<dyn FrameSink> = Box::new(WireFrames::new(io::stdout()));
    match dispatcher.dispatch(uri, None, Some(sink)) {
        Outcome::Rendered(rendered) => {
            let mut stdout = io::stdout().lock();
            stdout.write_all(&rendered.body)?;
            stdout.flush()?;
            if !rendered.status.is_success() {
                tracing::warn!(uri = %uri, status = %rendered.status, "Dispatch did not succeed");
            }
        }
        Outcome::Streamed => {}
    }
    Ok(())
}
