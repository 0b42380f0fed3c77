//! Separation webhook notifier
//!
//! Best effort: a failed notification is logged and otherwise ignored.

use std::time::Duration;

use serde::Serialize;

const CALLBACK_TIMEOUT: Duration = Duration::from_secs(10);

/// Body posted to the webhook
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CallbackPayload {
    #[serde(rename_all = "camelCase")]
    Completed { beat_id: String, stems_zip_url: String },
    #[serde(rename_all = "camelCase")]
    Failed { beat_id: String, error: String },
}

impl CallbackPayload {
    pub fn completed(beat_id: &str, stems_zip_url: &str) -> Self {
        Self::Completed {
            beat_id: beat_id.to_string(),
            stems_zip_url: stems_zip_url.to_string(),
        }
    }

    pub fn failed(beat_id: &str, error: impl ToString) -> Self {
        Self::Failed {
            beat_id: beat_id.to_string(),
            error: error.to_string(),
        }
    }

    fn beat_id(&self) -> &str {
        match self {
            Self::Completed { beat_id, .. } | Self::Failed { beat_id, .. } => beat_id,
        }
    }
}

/// Posts separation outcomes to the configured webhook, if any
#[derive(Clone)]
pub struct CallbackNotifier {
    http_client: reqwest::Client,
    url: Option<String>,
}

impl CallbackNotifier {
    pub fn new(http_client: reqwest::Client, url: Option<String>) -> Self {
        Self { http_client, url }
    }

    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    /// Send `payload`; never fails
    pub async fn notify(&self, payload: &CallbackPayload) {
        let Some(url) = self.url.as_deref() else {
            return;
        };

        let result = self
            .http_client
            .post(url)
            .json(payload)
            .timeout(CALLBACK_TIMEOUT)
            .send()
            .await;

        match result {
            Ok(response) if response.status().is_success() => {
                tracing::debug!(beat_id = %payload.beat_id(), url = %url, "Callback delivered");
            }
            Ok(response) => {
                tracing::warn!(
                    beat_id = %payload.beat_id(),
                    url = %url,
                    status = %response.status(),
                    "Callback rejected by webhook"
                );
            }
            Err(e) => {
                tracing::warn!(
                    beat_id = %payload.beat_id(),
                    url = %url,
                    error = %e,
                    "Callback delivery failed"
                );
            }
        }
    }
}
