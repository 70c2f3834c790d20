//! HTTP route handlers
//!
//! Three fixed endpoints: `/health`, `/api/info` and `/`. Anything else is a
//! plain-text 404.

use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

use crate::build_info::BuildInfo;
use crate::config::ServerConfig;

/// Service name reported by `/api/info`
pub const SERVICE_NAME: &str = "example-server";

/// Shared state for the route handlers
#[derive(Clone)]
pub struct AppState {
    pub build: BuildInfo,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    pub fn new(config: ServerConfig, build: BuildInfo) -> Self {
        Self {
            build,
            config: Arc::new(config),
        }
    }
}

/// `/health` body
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub commit: &'static str,
    pub timestamp: String,
}

impl HealthResponse {
    pub fn healthy(build: &BuildInfo, now: DateTime<Utc>) -> Self {
        Self {
            status: "healthy",
            version: build.version,
            commit: build.commit,
            timestamp: now.to_rfc3339_opts(SecondsFormat::Secs, true),
        }
    }
}

/// `/api/info` body
#[derive(Debug, Serialize)]
pub struct InfoResponse {
    pub service: &'static str,
    pub version: &'static str,
    pub build_info: BuildSection,
    pub runtime: RuntimeSection,
}

#[derive(Debug, Serialize)]
pub struct BuildSection {
    pub commit: &'static str,
    pub date: &'static str,
}

#[derive(Debug, Serialize)]
pub struct RuntimeSection {
    pub host: String,
    /// Port as a string, e.g. `"8080"`
    pub port: String,
}

impl InfoResponse {
    pub fn new(build: &BuildInfo, config: &ServerConfig) -> Self {
        Self {
            service: SERVICE_NAME,
            version: build.version,
            build_info: BuildSection {
                commit: build.commit,
                date: build.date,
            },
            runtime: RuntimeSection {
                host: config.host.clone(),
                port: config.port.to_string(),
            },
        }
    }
}

/// Create the router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/api/info", get(info_handler))
        .route("/", get(root_handler))
        .fallback(not_found_handler)
        .with_state(state)
}

async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    tracing::debug!("Health check");
    Json(HealthResponse::healthy(&state.build, Utc::now()))
}

async fn info_handler(State(state): State<AppState>) -> Json<InfoResponse> {
    tracing::debug!("Service info requested");
    Json(InfoResponse::new(&state.build, &state.config))
}

async fn root_handler(State(state): State<AppState>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        root_banner(&state.build),
    )
}

async fn not_found_handler() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        "404 page not found\n",
    )
}

/// Plain-text body served at `/`
pub fn root_banner(build: &BuildInfo) -> String {
    format!(
        "Example Server - Multi-binary demo\n\
         Version: {}\n\
         Endpoints:\n\
         - GET /health - Health check\n\
         - GET /api/info - Service information\n",
        build.version
    )
}
