//! Error types for beatproc
//!
//! Every failure is reported as `{"error": "<message>"}`. The status code
//! tells the kind apart; with legacy status enabled the router rewrites
//! all of them to 200.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use beatproc_common::StorageError;
use serde_json::json;
use thiserror::Error;

use crate::services::{FetchError, ProcessingError};

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Missing or malformed request field (400)
    #[error("{0}")]
    Validation(String),

    /// Input or tag download failed (502)
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// Separator, external tool, or packaging failed (500)
    #[error(transparent)]
    Processing(#[from] ProcessingError),

    /// Object store refused or could not be reached (502)
    #[error(transparent)]
    Upload(#[from] StorageError),

    /// Anything else (500)
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Fetch(_) => StatusCode::BAD_GATEWAY,
            ApiError::Processing(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Upload(_) => StatusCode::BAD_GATEWAY,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::Validation(_) => "validation",
            ApiError::Fetch(_) => "fetch",
            ApiError::Processing(_) => "processing",
            ApiError::Upload(_) => "upload",
            ApiError::Internal(_) => "internal",
        }
    }
}

/// Scratch space and other shared-library failures
impl From<beatproc_common::Error> for ApiError {
    fn from(err: beatproc_common::Error) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(kind = self.kind(), error = %self, "Request failed");
        } else {
            tracing::info!(kind = self.kind(), error = %self, "Request rejected");
        }

        let body = Json(json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
