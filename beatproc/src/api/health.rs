//! Health check endpoints

use axum::{extract::State, routing::get, Json, Router};
use chrono::Utc;
use serde::Serialize;

use crate::AppState;

pub const SERVICE_NAME: &str = "NOKAN Beat Processor";

/// GET / response, kept in the shape existing clients poll for
#[derive(Debug, Serialize)]
pub struct ServiceStatus {
    pub service: &'static str,
    pub status: &'static str,
}

/// GET /health response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Service status ("ok", or "degraded" without object storage)
    pub status: String,
    /// Module name ("beatproc")
    pub module: String,
    /// Crate version from Cargo.toml
    pub version: String,
    /// Seconds since service started
    pub uptime_seconds: u64,
    pub storage_configured: bool,
}

/// GET /
pub async fn service_status() -> Json<ServiceStatus> {
    Json(ServiceStatus {
        service: SERVICE_NAME,
        status: "running",
    })
}

/// GET /health
///
/// Reports "degraded" when no object store was configured, since every
/// processing request would then fail at upload.
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let uptime = Utc::now().signed_duration_since(state.startup_time);
    let storage_configured = state.uploader.is_configured();

    Json(HealthResponse {
        status: if storage_configured { "ok" } else { "degraded" }.to_string(),
        module: "beatproc".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: uptime.num_seconds().max(0) as u64,
        storage_configured,
    })
}

/// Build health check routes
pub fn health_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(service_status))
        .route("/health", get(health_check))
}
