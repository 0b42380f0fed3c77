//! beatproc library - Beat Processor service
//!
//! Exposes the router and state so integration tests can drive the service
//! without binding a socket.

pub mod api;
pub mod config;
pub mod error;
pub mod services;

pub use crate::config::Config;
pub use crate::error::{ApiError, ApiResult};

use std::path::PathBuf;
use std::sync::Arc;

use axum::{extract::DefaultBodyLimit, middleware, Router};
use beatproc_common::ObjectStore;
use chrono::{DateTime, Utc};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::services::{
    CallbackNotifier, InputFetcher, PlaceholderSeparator, StemSeparator, Uploader, Watermarker,
};

/// Uploaded audio can be large; axum's 2 MiB default is far too small
pub const MAX_UPLOAD_BYTES: usize = 512 * 1024 * 1024;

const USER_AGENT: &str = concat!("beatproc/", env!("CARGO_PKG_VERSION"));

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Writes uploads and downloads to scratch space
    pub fetcher: InputFetcher,
    /// Stem separation backend
    pub separator: Arc<dyn StemSeparator>,
    /// ffmpeg binding for tag overlays
    pub watermarker: Arc<Watermarker>,
    /// Object store publisher (unconfigured store fails every upload)
    pub uploader: Uploader,
    /// Separation webhook
    pub callback: CallbackNotifier,
    /// Parent directory for per-request scratch dirs
    pub scratch_root: Option<PathBuf>,
    /// Report errors with HTTP 200
    pub legacy_status: bool,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    /// State with the placeholder separator; swap it with [`AppState::with_separator`]
    pub fn new(
        config: &Config,
        http_client: reqwest::Client,
        store: Option<Arc<dyn ObjectStore>>,
    ) -> Self {
        Self {
            fetcher: InputFetcher::new(http_client.clone()),
            separator: Arc::new(PlaceholderSeparator),
            watermarker: Arc::new(Watermarker::new(&config.watermark)),
            uploader: Uploader::new(store),
            callback: CallbackNotifier::new(http_client, config.callback_url.clone()),
            scratch_root: config.scratch_root.clone(),
            legacy_status: config.legacy_status,
            startup_time: Utc::now(),
        }
    }

    pub fn with_separator(mut self, separator: Arc<dyn StemSeparator>) -> Self {
        self.separator = separator;
        self
    }
}

/// Outbound HTTP client shared by downloads, uploads, and callbacks
pub fn http_client() -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder().user_agent(USER_AGENT).build()
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    let legacy_status = state.legacy_status;

    let mut router = Router::new()
        .merge(api::health_routes())
        .merge(api::separate_routes())
        .merge(api::watermark_routes())
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .with_state(state);

    if legacy_status {
        router = router.layer(middleware::map_response(api::force_ok_status));
    }

    router
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
