//! Shared fixtures for beatproc integration tests
//!
//! - `MemoryStore`: object store keeping uploads in memory
//! - `Upstream`: local HTTP server serving audio files and recording webhook calls
//! - request builders for multipart and urlencoded forms

#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::{Body, Bytes};
use axum::extract::State;
use axum::http::{Request, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use beatproc::{build_router, AppState, Config};
use beatproc_common::{ObjectStore, StorageError, UploadResult};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

pub const PUBLIC_BASE: &str = "https://storage.test/nokan-beats";

/// Object stored by [`MemoryStore`]
#[derive(Debug, Clone)]
pub struct StoredObject {
    pub data: Vec<u8>,
    pub content_type: String,
}

/// In-memory object store; later uploads to a key replace earlier ones
#[derive(Clone, Default)]
pub struct MemoryStore {
    objects: Arc<Mutex<HashMap<String, StoredObject>>>,
    uploads: Arc<Mutex<usize>>,
}

impl MemoryStore {
    pub fn get(&self, key: &str) -> Option<StoredObject> {
        self.objects.lock().unwrap().get(key).cloned()
    }

    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.objects.lock().unwrap().keys().cloned().collect();
        keys.sort();
        keys
    }

    pub fn upload_count(&self) -> usize {
        *self.uploads.lock().unwrap()
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn upload_public(
        &self,
        local: &Path,
        key: &str,
        content_type: &str,
    ) -> Result<UploadResult, StorageError> {
        let data = tokio::fs::read(local).await?;
        self.objects.lock().unwrap().insert(
            key.to_string(),
            StoredObject {
                data,
                content_type: content_type.to_string(),
            },
        );
        *self.uploads.lock().unwrap() += 1;
        Ok(UploadResult {
            key: key.to_string(),
            public_url: format!("{}/{}", PUBLIC_BASE, key),
        })
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

/// Local stand-in for the audio host and the webhook receiver
pub struct Upstream {
    pub addr: SocketAddr,
    callbacks: Arc<Mutex<Vec<Value>>>,
}

impl Upstream {
    pub async fn start() -> Self {
        let callbacks: Arc<Mutex<Vec<Value>>> = Arc::new(Mutex::new(Vec::new()));

        let app = Router::new()
            .route("/audio/beat.wav", get(|| async { Bytes::from_static(b"RIFF....WAVEfmt beat") }))
            .route("/audio/tag.wav", get(|| async { Bytes::from_static(b"RIFF....WAVEfmt tag") }))
            .route("/audio/missing.wav", get(|| async { StatusCode::NOT_FOUND }))
            .route("/callback", post(record_callback))
            .route("/broken-callback", post(|| async { StatusCode::INTERNAL_SERVER_ERROR }))
            .with_state(callbacks.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { addr, callbacks }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub fn callbacks(&self) -> Vec<Value> {
        self.callbacks.lock().unwrap().clone()
    }
}

async fn record_callback(
    State(callbacks): State<Arc<Mutex<Vec<Value>>>>,
    Json(body): Json<Value>,
) -> StatusCode {
    callbacks.lock().unwrap().push(body);
    StatusCode::OK
}

/// URL on a port nothing listens on
pub fn unreachable_url(path: &str) -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}{}", addr, path)
}

/// Router over a fresh state built from `config`
pub fn test_app(config: &Config, store: Option<MemoryStore>) -> Router {
    let store = store.map(|s| Arc::new(s) as Arc<dyn ObjectStore>);
    let state = AppState::new(config, reqwest::Client::new(), store);
    build_router(state)
}

/// Multipart body builder
pub struct MultipartForm {
    boundary: String,
    body: Vec<u8>,
}

impl MultipartForm {
    pub fn new() -> Self {
        Self {
            boundary: "beatproc-test-boundary".to_string(),
            body: Vec::new(),
        }
    }

    pub fn text(mut self, name: &str, value: &str) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                self.boundary, name, value
            )
            .as_bytes(),
        );
        self
    }

    pub fn file(mut self, name: &str, file_name: &str, data: &[u8]) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: audio/wav\r\n\r\n",
                self.boundary, name, file_name
            )
            .as_bytes(),
        );
        self.body.extend_from_slice(data);
        self.body.extend_from_slice(b"\r\n");
        self
    }

    pub fn into_request(mut self, uri: &str) -> Request<Body> {
        self.body
            .extend_from_slice(format!("--{}--\r\n", self.boundary).as_bytes());
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(
                "content-type",
                format!("multipart/form-data; boundary={}", self.boundary),
            )
            .body(Body::from(self.body))
            .unwrap()
    }
}

/// `application/x-www-form-urlencoded` POST
pub fn urlencoded_request(uri: &str, fields: &[(&str, &str)]) -> Request<Body> {
    let body = fields
        .iter()
        .map(|(k, v)| format!("{}={}", encode(k), encode(v)))
        .collect::<Vec<_>>()
        .join("&");
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/x-www-form-urlencoded")
        .body(Body::from(body))
        .unwrap()
}

fn encode(value: &str) -> String {
    url::form_urlencoded::byte_serialize(value.as_bytes()).collect()
}

/// Send `request` through `app`, returning status and JSON body
pub async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}
