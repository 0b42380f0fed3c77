//! Storage uploader
//!
//! Wraps the optional object store configured at startup and owns the
//! bucket key layout.

use std::path::Path;
use std::sync::Arc;

use beatproc_common::storage::{GcsStore, ServiceAccountKey, TokenProvider};
use beatproc_common::{Error, ObjectStore, StorageError, UploadResult};
use tracing::{info, warn};

use crate::config::StorageConfig;

pub const ZIP_CONTENT_TYPE: &str = "application/zip";
pub const MP3_CONTENT_TYPE: &str = "audio/mpeg";

/// Key of a beat's stem archive; the same beat always maps to the same key
pub fn stems_key(beat_id: &str) -> String {
    format!("stems/{beat_id}_stems.zip")
}

/// Key of a watermarked render
pub fn watermark_key(file_name: &str) -> String {
    format!("watermarked/{file_name}")
}

/// Build the object store described by `config`.
///
/// - emulator host set: anonymous store on the emulator
/// - credentials set: authenticated Google Cloud Storage
/// - neither: `None`; uploads will fail with [`StorageError::NotConfigured`]
///
/// Credentials that cannot be read, or a store without a bucket, are errors.
pub fn open_store(
    config: &StorageConfig,
    http_client: &reqwest::Client,
) -> beatproc_common::Result<Option<Arc<dyn ObjectStore>>> {
    let bucket = || {
        config.bucket.as_deref().ok_or_else(|| {
            Error::Config("FIREBASE_BUCKET must be set when storage is configured".to_string())
        })
    };

    if let Some(host) = &config.emulator_host {
        let store = GcsStore::with_emulator(http_client.clone(), bucket()?, host)?;
        info!(bucket = %store.bucket(), emulator = %host, "Using storage emulator");
        return Ok(Some(Arc::new(store)));
    }

    if let Some(path) = &config.credentials {
        let key = ServiceAccountKey::from_file(path)?;
        let auth = TokenProvider::new(key, http_client.clone())?;
        info!(client_email = %auth.client_email(), "Loaded service-account credentials");
        let store = GcsStore::new(http_client.clone(), bucket()?, auth)?;
        info!(bucket = %store.bucket(), "Using Google Cloud Storage");
        return Ok(Some(Arc::new(store)));
    }

    warn!("No storage credentials configured; uploads will fail until GOOGLE_APPLICATION_CREDENTIALS is set");
    Ok(None)
}

/// Publishes artifacts to the configured store
#[derive(Clone)]
pub struct Uploader {
    store: Option<Arc<dyn ObjectStore>>,
}

impl Uploader {
    pub fn new(store: Option<Arc<dyn ObjectStore>>) -> Self {
        Self { store }
    }

    pub fn is_configured(&self) -> bool {
        self.store.is_some()
    }

    /// Upload `local` under `key` and make it public
    pub async fn publish(
        &self,
        local: &Path,
        key: &str,
        content_type: &str,
    ) -> Result<UploadResult, StorageError> {
        let store = self.store.as_ref().ok_or(StorageError::NotConfigured)?;
        let result = store.upload_public(local, key, content_type).await?;
        tracing::debug!(store = store.name(), key = %key, url = %result.public_url, "Artifact published");
        Ok(result)
    }
}
