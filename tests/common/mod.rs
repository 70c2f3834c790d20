//! Shared test utilities for the lifecycle and route tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{routing::get, Router};
use multibin_demo::config::ServerConfig;
use multibin_demo::routes::{create_router, AppState};
use multibin_demo::BuildInfo;
use tokio::sync::Notify;

/// Build metadata used across tests.
pub fn test_build() -> BuildInfo {
    BuildInfo::new("1.2.3", "abc1234", "2025-06-22T21:16:23Z")
}

/// The production router with test build metadata.
pub fn app_router() -> Router {
    create_router(AppState::new(
        ServerConfig::new("localhost", 8080),
        test_build(),
    ))
}

/// A router whose `/slow` handler signals `entered` and then sleeps for
/// `delay` before answering `"done"`.
pub fn slow_router(delay: Duration, entered: Arc<Notify>) -> Router {
    Router::new().route(
        "/slow",
        get(move || {
            let entered = entered.clone();
            async move {
                entered.notify_one();
                tokio::time::sleep(delay).await;
                "done"
            }
        }),
    )
}

/// Reserve a free local port by binding and immediately releasing it.
pub fn free_local_addr() -> SocketAddr {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("Failed to bind a free port");
    listener.local_addr().expect("Failed to read local address")
}
