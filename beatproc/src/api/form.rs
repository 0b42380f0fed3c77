//! Form field extractor
//!
//! Accepts `multipart/form-data` (text fields and file uploads) and
//! `application/x-www-form-urlencoded`. Any other body is treated as an
//! empty form so the handlers report which field is missing.

use std::collections::HashMap;

use axum::{
    async_trait,
    body::Bytes,
    extract::{FromRequest, Multipart, Request},
    http::header::CONTENT_TYPE,
    Form,
};

use crate::error::ApiError;

/// File part of a multipart form
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: String,
    pub data: Bytes,
}

/// Parsed request form
#[derive(Debug, Clone, Default)]
pub struct FormFields {
    text: HashMap<String, String>,
    files: HashMap<String, UploadedFile>,
}

impl FormFields {
    /// Text value of `name`, trimmed; blank counts as missing
    pub fn text(&self, name: &str) -> Option<&str> {
        self.text
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    /// Uploaded file `name`; an empty part counts as missing
    pub fn file(&self, name: &str) -> Option<&UploadedFile> {
        self.files.get(name).filter(|f| !f.data.is_empty())
    }
}

#[async_trait]
impl<S> FromRequest<S> for FormFields
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let content_type = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_ascii_lowercase();

        if content_type.starts_with("multipart/form-data") {
            let multipart = Multipart::from_request(req, state)
                .await
                .map_err(|e| ApiError::validation(e.body_text()))?;
            return read_multipart(multipart).await;
        }

        if content_type.starts_with("application/x-www-form-urlencoded") {
            let Form(text) = Form::<HashMap<String, String>>::from_request(req, state)
                .await
                .map_err(|e| ApiError::validation(e.body_text()))?;
            return Ok(Self {
                text,
                files: HashMap::new(),
            });
        }

        Ok(Self::default())
    }
}

async fn read_multipart(mut multipart: Multipart) -> Result<FormFields, ApiError> {
    let mut form = FormFields::default();
    let invalid = |e: axum::extract::multipart::MultipartError| ApiError::validation(e.body_text());

    while let Some(field) = multipart.next_field().await.map_err(invalid)? {
        let Some(name) = field.name().map(str::to_owned) else {
            continue;
        };

        match field.file_name().map(str::to_owned) {
            Some(file_name) => {
                let data = field.bytes().await.map_err(invalid)?;
                tracing::debug!(field = %name, file_name = %file_name, bytes = data.len(), "Received file part");
                form.files.insert(name, UploadedFile { file_name, data });
            }
            None => {
                let value = field.text().await.map_err(invalid)?;
                form.text.insert(name, value);
            }
        }
    }

    Ok(form)
}
