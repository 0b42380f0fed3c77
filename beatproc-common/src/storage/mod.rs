//! Object storage abstraction
//!
//! Artifacts are pushed to a bucket, made publicly readable, and addressed
//! by their public URL afterwards. [`GcsStore`] talks to Google Cloud
//! Storage (the store behind Firebase Storage) or to a local emulator.

mod credentials;
mod gcs;

pub use credentials::{ServiceAccountKey, TokenProvider};
pub use gcs::{GcsStore, DEFAULT_API_BASE, DEFAULT_PUBLIC_BASE};

use std::path::Path;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

/// Object storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    /// No store was initialized at startup
    #[error("Object storage is not configured (no bucket credentials were supplied at startup)")]
    NotConfigured,

    /// Access token could not be obtained
    #[error("Storage authentication failed: {0}")]
    Auth(String),

    /// Transport-level failure talking to the store
    #[error("Storage request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The store answered with a non-success status
    #[error("Storage rejected upload of {key} ({status}): {body}")]
    Rejected {
        key: String,
        status: u16,
        body: String,
    },

    /// Key with an empty, `.` or `..` segment; its URL path would resolve
    /// to a different object than the one uploaded
    #[error("Invalid object key {0:?}")]
    InvalidKey(String),

    /// Endpoint URL could not be built
    #[error("Invalid storage URL: {0}")]
    InvalidUrl(String),

    /// Local artifact could not be read
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Where an uploaded object ended up
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadResult {
    /// Object key inside the bucket
    pub key: String,
    /// Publicly readable URL of the object
    pub public_url: String,
}

/// Check that every `/`-separated segment of `key` is a plain name
pub fn validate_key(key: &str) -> Result<(), StorageError> {
    if key.split('/').any(|s| s.is_empty() || s == "." || s == "..") {
        return Err(StorageError::InvalidKey(key.to_string()));
    }
    Ok(())
}

/// Blob store that can publish local files
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Upload `local` under `key`, mark it publicly readable, and return its
    /// public URL. Uploading to an existing key replaces the object.
    async fn upload_public(
        &self,
        local: &Path,
        key: &str,
        content_type: &str,
    ) -> Result<UploadResult, StorageError>;

    /// Short backend name used in logs
    fn name(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_keys_are_valid() {
        assert!(validate_key("stems/beat-42_stems.zip").is_ok());
        assert!(validate_key("watermarked/a b.mp3").is_ok());
        assert!(validate_key("stems/.hidden_stems.zip").is_ok());
    }

    #[test]
    fn test_dot_segments_are_invalid() {
        for key in ["stems/../other_stems.zip", "stems/x/../beat-7_stems.zip", "./a", "a//b", "a/"] {
            assert!(
                matches!(validate_key(key), Err(StorageError::InvalidKey(ref k)) if k == key),
                "accepted {:?}",
                key
            );
        }
    }
}
