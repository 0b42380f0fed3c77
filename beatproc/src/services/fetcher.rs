//! Input fetcher
//!
//! Puts the request's audio on local disk, either from the multipart upload
//! or by streaming a URL chunk by chunk.

use std::path::Path;

use axum::body::Bytes;
use thiserror::Error;
use tokio::io::AsyncWriteExt;

/// Download errors
#[derive(Debug, Error)]
pub enum FetchError {
    /// Connection, DNS, TLS, or mid-body transport failure
    #[error("Failed to download {url}: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// Remote answered with a non-success status
    #[error("Failed to download {url}: HTTP {status}")]
    Status { url: String, status: u16 },

    /// Local write failed
    #[error("Failed to store downloaded audio: {0}")]
    Io(#[from] std::io::Error),
}

/// Where a request's audio comes from
#[derive(Debug, Clone)]
pub enum InputSource {
    /// Bytes uploaded with the request
    Upload(Bytes),
    /// Remote file to download
    Url(String),
}

impl InputSource {
    /// Upload wins when both are present; empty values count as absent
    pub fn select(upload: Option<Bytes>, url: Option<&str>) -> Option<Self> {
        match (upload.filter(|b| !b.is_empty()), url.map(str::trim)) {
            (Some(bytes), _) => Some(Self::Upload(bytes)),
            (None, Some(url)) if !url.is_empty() => Some(Self::Url(url.to_string())),
            _ => None,
        }
    }
}

/// Writes request inputs to disk
#[derive(Clone)]
pub struct InputFetcher {
    http_client: reqwest::Client,
}

impl InputFetcher {
    pub fn new(http_client: reqwest::Client) -> Self {
        Self { http_client }
    }

    /// Materialize `source` at `dest`, returning the number of bytes written
    pub async fn fetch(&self, source: &InputSource, dest: &Path) -> Result<u64, FetchError> {
        match source {
            InputSource::Upload(bytes) => {
                tokio::fs::write(dest, bytes).await?;
                tracing::debug!(dest = %dest.display(), bytes = bytes.len(), "Stored uploaded audio");
                Ok(bytes.len() as u64)
            }
            InputSource::Url(url) => self.download(url, dest).await,
        }
    }

    /// Stream `url` into `dest` without buffering the whole body
    pub async fn download(&self, url: &str, dest: &Path) -> Result<u64, FetchError> {
        let request_error = |source: reqwest::Error| FetchError::Request {
            url: url.to_string(),
            source,
        };

        let mut response = self
            .http_client
            .get(url)
            .send()
            .await
            .map_err(request_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let mut file = tokio::fs::File::create(dest).await?;
        let mut written: u64 = 0;
        while let Some(chunk) = response.chunk().await.map_err(request_error)? {
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;

        tracing::debug!(url = %url, dest = %dest.display(), bytes = written, "Downloaded input");
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_prefers_upload() {
        let source = InputSource::select(Some(Bytes::from_static(b"RIFF")), Some("http://a/b.wav"));
        assert!(matches!(source, Some(InputSource::Upload(b)) if &b[..] == b"RIFF"));
    }

    #[test]
    fn test_select_falls_back_to_url() {
        let source = InputSource::select(None, Some(" http://a/b.wav "));
        assert!(matches!(source, Some(InputSource::Url(u)) if u == "http://a/b.wav"));

        let source = InputSource::select(Some(Bytes::new()), Some("http://a/b.wav"));
        assert!(matches!(source, Some(InputSource::Url(_))));
    }

    #[test]
    fn test_select_nothing() {
        assert!(InputSource::select(None, None).is_none());
        assert!(InputSource::select(Some(Bytes::new()), Some("   ")).is_none());
    }

    #[tokio::test]
    async fn test_fetch_upload_writes_bytes_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("input.wav");
        let fetcher = InputFetcher::new(reqwest::Client::new());

        let written = fetcher
            .fetch(&InputSource::Upload(Bytes::from_static(b"\x00\x01audio")), &dest)
            .await
            .unwrap();

        assert_eq!(written, 7);
        assert_eq!(std::fs::read(&dest).unwrap(), b"\x00\x01audio");
    }

    #[tokio::test]
    async fn test_download_invalid_url_is_request_error() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = InputFetcher::new(reqwest::Client::new());

        let err = fetcher
            .download("not a url", &dir.path().join("input.wav"))
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Request { .. }));
    }
}
