use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::http::server::AppState;

#[derive(Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub status: &'static str,
    pub handlers: usize,
    pub hooks: usize,
    pub cache_entries: usize,
}

#[derive(Serialize)]
pub struct CacheSummary {
    pub enabled: bool,
    pub entries: usize,
    pub keys: Vec<String>,
}

pub async fn get_status(State(state): State<AppState>) -> Json<SystemStatus> {
    let dispatcher = &state.dispatcher;
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        status: "operational",
        handlers: dispatcher.handlers().len(),
        hooks: dispatcher.hooks().len(),
        cache_entries: dispatcher.cache().len(),
    })
}

/// Internal dispatch counts per URI.
pub async fn get_calls(State(state): State<AppState>) -> Json<BTreeMap<String, u64>> {
    Json(state.dispatcher.calls().snapshot())
}

pub async fn get_hooks(State(state): State<AppState>) -> Json<BTreeMap<String, Vec<String>>> {
    Json(state.dispatcher.hooks().snapshot())
}

pub async fn get_cache(State(state): State<AppState>) -> Json<CacheSummary> {
    let cache = state.dispatcher.cache();
    let keys = cache.keys();
    Json(CacheSummary {
        enabled: state.config.cache.enabled,
        entries: keys.len(),
        keys,
    })
}

/// Purge one cached handler output (`blog_post` for `blog/post`).
pub async fn delete_cache_entry(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> StatusCode {
    if state.dispatcher.cache().delete(&key) {
        tracing::info!(key = %key, "Purged cache entry");
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    }
}
