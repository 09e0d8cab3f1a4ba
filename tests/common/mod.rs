//! Shared utilities for integration tests.

use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;

use cascade_dispatch::admin::setup_admin_router;
use cascade_dispatch::config::EngineConfig;
use cascade_dispatch::dispatch::Dispatcher;
use cascade_dispatch::handler::HandlerRegistry;
use cascade_dispatch::http::HttpServer;
use cascade_dispatch::lifecycle::{shutdown, Shutdown};

pub const ADMIN_KEY: &str = "test-admin-key";

/// A running engine bound to ephemeral ports.
#[allow(dead_code)]
pub struct TestServer {
    pub addr: SocketAddr,
    pub admin_addr: SocketAddr,
    pub dispatcher: Arc<Dispatcher>,
    pub shutdown: Shutdown,
}

#[allow(dead_code)]
impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub fn admin_url(&self, path: &str) -> String {
        format!("http://{}{}", self.admin_addr, path)
    }
}

/// Start the HTTP front end and the admin API for `handlers`.
pub async fn start_server(mut config: EngineConfig, handlers: HandlerRegistry) -> TestServer {
    config.admin.api_key = ADMIN_KEY.to_string();
    let server = HttpServer::new(Arc::new(config), handlers);
    let dispatcher = server.dispatcher().clone();
    let shutdown = Shutdown::new();

    let admin_listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let admin_addr = admin_listener.local_addr().unwrap();
    let admin = setup_admin_router(server.state());
    let admin_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = axum::serve(admin_listener, admin)
            .with_graceful_shutdown(shutdown::wait(admin_shutdown))
            .await;
    });

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    TestServer {
        addr,
        admin_addr,
        dispatcher,
        shutdown,
    }
}

/// Client that reports redirects instead of following them.
#[allow(dead_code)]
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .no_proxy()
        .build()
        .unwrap()
}
