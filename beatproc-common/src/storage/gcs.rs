//! Google Cloud Storage client
//!
//! Uses the JSON API media upload with `predefinedAcl=publicRead`, so the
//! object is written and made public in one request.

use std::path::Path;

use async_trait::async_trait;
use url::Url;

use super::{validate_key, ObjectStore, StorageError, TokenProvider, UploadResult};
use crate::{Error, Result};

pub const DEFAULT_API_BASE: &str = "https://storage.googleapis.com/";
pub const DEFAULT_PUBLIC_BASE: &str = "https://storage.googleapis.com/";

/// Bucket handle for Google Cloud Storage
pub struct GcsStore {
    http_client: reqwest::Client,
    bucket: String,
    api_base: Url,
    public_base: Url,
    /// `None` when talking to an emulator, which accepts anonymous writes
    auth: Option<TokenProvider>,
}

impl GcsStore {
    /// Production bucket authenticated with a service account
    pub fn new(http_client: reqwest::Client, bucket: &str, auth: TokenProvider) -> Result<Self> {
        Ok(Self {
            http_client,
            bucket: validate_bucket(bucket)?,
            api_base: parse_base(DEFAULT_API_BASE)?,
            public_base: parse_base(DEFAULT_PUBLIC_BASE)?,
            auth: Some(auth),
        })
    }

    /// Bucket served by a local storage emulator, e.g. `localhost:9199`
    pub fn with_emulator(http_client: reqwest::Client, bucket: &str, host: &str) -> Result<Self> {
        let base = parse_base(&emulator_base(host))?;
        Ok(Self {
            http_client,
            bucket: validate_bucket(bucket)?,
            api_base: base.clone(),
            public_base: base,
            auth: None,
        })
    }

    /// Send uploads to `base` instead of the public API endpoint.
    /// Public URLs are unaffected.
    pub fn with_api_base(mut self, base: &str) -> Result<Self> {
        self.api_base = parse_base(base)?;
        Ok(self)
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Public URL of `key`, one percent-encoded path segment per key segment
    pub fn public_url(&self, key: &str) -> std::result::Result<String, StorageError> {
        validate_key(key)?;
        let mut url = self.public_base.clone();
        url.path_segments_mut()
            .map_err(|_| StorageError::InvalidUrl(self.public_base.to_string()))?
            .pop_if_empty()
            .push(&self.bucket)
            .extend(key.split('/'));
        Ok(url.into())
    }

    fn upload_url(&self, key: &str) -> std::result::Result<Url, StorageError> {
        let mut url = self.api_base.clone();
        url.path_segments_mut()
            .map_err(|_| StorageError::InvalidUrl(self.api_base.to_string()))?
            .pop_if_empty()
            .extend(["upload", "storage", "v1", "b", self.bucket.as_str(), "o"]);
        url.query_pairs_mut()
            .append_pair("uploadType", "media")
            .append_pair("name", key)
            .append_pair("predefinedAcl", "publicRead");
        Ok(url)
    }
}

#[async_trait]
impl ObjectStore for GcsStore {
    async fn upload_public(
        &self,
        local: &Path,
        key: &str,
        content_type: &str,
    ) -> std::result::Result<UploadResult, StorageError> {
        validate_key(key)?;
        let body = tokio::fs::read(local).await?;
        let size = body.len();
        let url = self.upload_url(key)?;

        tracing::debug!(bucket = %self.bucket, key = %key, size, "Uploading object");

        let mut request = self
            .http_client
            .post(url)
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(body);
        if let Some(auth) = &self.auth {
            request = request.bearer_auth(auth.access_token().await?);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StorageError::Rejected {
                key: key.to_string(),
                status: status.as_u16(),
                body,
            });
        }

        let public_url = self.public_url(key)?;
        tracing::info!(bucket = %self.bucket, key = %key, size, "Object uploaded and published");

        Ok(UploadResult {
            key: key.to_string(),
            public_url,
        })
    }

    fn name(&self) -> &'static str {
        "gcs"
    }
}

fn validate_bucket(bucket: &str) -> Result<String> {
    let bucket = bucket.trim();
    if bucket.is_empty() || bucket.contains('/') {
        return Err(Error::Config(format!("Invalid bucket name: {:?}", bucket)));
    }
    Ok(bucket.to_string())
}

/// Emulator hosts are conventionally given without a scheme
fn emulator_base(host: &str) -> String {
    let host = host.trim().trim_end_matches('/');
    if host.contains("://") {
        format!("{}/", host)
    } else {
        format!("http://{}/", host)
    }
}

fn parse_base(base: &str) -> Result<Url> {
    Url::parse(base).map_err(|e| Error::Config(format!("Invalid storage endpoint {}: {}", base, e)))
}
