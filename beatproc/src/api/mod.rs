//! HTTP API handlers for beatproc

pub mod form;
pub mod health;
pub mod separate;
pub mod watermark;

pub use form::{FormFields, UploadedFile};
pub use health::health_routes;
pub use separate::separate_routes;
pub use watermark::watermark_routes;

use axum::{
    http::{header::CONTENT_TYPE, StatusCode},
    response::Response,
};

/// Rewrites JSON error responses to 200 for clients that only look at the
/// body. Only installed when legacy status is enabled.
pub async fn force_ok_status(mut response: Response) -> Response {
    let status = response.status();
    let is_json = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("application/json"));

    if is_json && (status.is_client_error() || status.is_server_error()) {
        *response.status_mut() = StatusCode::OK;
    }
    response
}
