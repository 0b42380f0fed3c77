//! Service-account credentials and OAuth2 access tokens
//!
//! Implements the JWT-bearer grant: a short-lived assertion signed with the
//! service account's RSA key is exchanged at the token endpoint for a bearer
//! token, which is cached until shortly before it expires.

use std::path::Path;
use std::time::{Duration, Instant};

use chrono::Utc;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use super::StorageError;
use crate::{Error, Result};

const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const STORAGE_SCOPE: &str = "https://www.googleapis.com/auth/devstorage.full_control";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_SECS: i64 = 3600;
/// Tokens are refreshed this long before the endpoint says they expire
const REFRESH_MARGIN: Duration = Duration::from_secs(60);

/// Fields of a service-account JSON key that the token exchange needs
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default)]
    pub token_uri: Option<String>,
    #[serde(default)]
    pub project_id: Option<String>,
}

impl ServiceAccountKey {
    /// Load a key file as downloaded from the cloud console
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Credentials(format!("Cannot read {}: {}", path.display(), e))
        })?;
        Self::from_json(&content)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| Error::Credentials(format!("Invalid service-account key: {}", e)))
    }

    fn token_uri(&self) -> &str {
        self.token_uri.as_deref().unwrap_or(DEFAULT_TOKEN_URI)
    }
}

#[derive(Debug, Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

struct CachedToken {
    value: String,
    refresh_at: Instant,
}

/// Mints and caches storage access tokens for one service account
pub struct TokenProvider {
    key: ServiceAccountKey,
    encoding_key: EncodingKey,
    http_client: reqwest::Client,
    cached: Mutex<Option<CachedToken>>,
}

impl TokenProvider {
    /// Fails if the key's private key is not a usable RSA PEM, so a broken
    /// credentials file is caught at startup rather than on first upload.
    pub fn new(key: ServiceAccountKey, http_client: reqwest::Client) -> Result<Self> {
        let encoding_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())
            .map_err(|e| Error::Credentials(format!("Invalid private key: {}", e)))?;

        Ok(Self {
            key,
            encoding_key,
            http_client,
            cached: Mutex::new(None),
        })
    }

    pub fn client_email(&self) -> &str {
        &self.key.client_email
    }

    /// Current bearer token, refreshed when missing or close to expiry
    pub async fn access_token(&self) -> std::result::Result<String, StorageError> {
        let mut cached = self.cached.lock().await;

        if let Some(token) = cached.as_ref() {
            if Instant::now() < token.refresh_at {
                return Ok(token.value.clone());
            }
        }

        let fresh = self.exchange().await?;
        let value = fresh.access_token.clone();
        let lifetime = Duration::from_secs(fresh.expires_in).saturating_sub(REFRESH_MARGIN);
        *cached = Some(CachedToken {
            value: fresh.access_token,
            refresh_at: Instant::now() + lifetime,
        });

        tracing::debug!(
            client_email = %self.key.client_email,
            expires_in = fresh.expires_in,
            "Obtained storage access token"
        );

        Ok(value)
    }

    fn sign_assertion(&self) -> std::result::Result<String, StorageError> {
        let now = Utc::now().timestamp();
        let claims = AssertionClaims {
            iss: &self.key.client_email,
            scope: STORAGE_SCOPE,
            aud: self.key.token_uri(),
            iat: now,
            exp: now + ASSERTION_LIFETIME_SECS,
        };

        jsonwebtoken::encode(&Header::new(Algorithm::RS256), &claims, &self.encoding_key)
            .map_err(|e| StorageError::Auth(format!("Cannot sign assertion: {}", e)))
    }

    async fn exchange(&self) -> std::result::Result<TokenResponse, StorageError> {
        let assertion = self.sign_assertion()?;
        let params = [("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())];

        let response = self
            .http_client
            .post(self.key.token_uri())
            .form(&params)
            .send()
            .await
            .map_err(|e| StorageError::Auth(format!("Token request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StorageError::Auth(format!(
                "Token endpoint returned {}: {}",
                status, body
            )));
        }

        response
            .json::<TokenResponse>()
            .await
            .map_err(|e| StorageError::Auth(format!("Malformed token response: {}", e)))
    }
}
