//! Stem separation endpoint
//!
//! POST /api/separate: fetch the input, run the separator, zip the stems,
//! publish the archive under the beat's key, and tell the webhook.

use axum::{extract::State, routing::post, Json, Router};
use beatproc_common::scratch::scratch_dir;
use beatproc_common::storage::validate_key;
use serde::Serialize;

use super::form::FormFields;
use crate::{
    error::{ApiError, ApiResult},
    services::{
        packager,
        uploader::{stems_key, ZIP_CONTENT_TYPE},
        CallbackPayload, InputSource,
    },
    AppState,
};

/// POST /api/separate response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeparateResponse {
    pub ok: bool,
    pub stems_zip_url: String,
}

/// POST /api/separate
///
/// Form fields: `beatId` (required), `file` (upload) or `fileUrl`.
/// Once `beatId` and an input are known, failures are also reported to the
/// webhook; webhook problems never change the response.
pub async fn separate(
    State(state): State<AppState>,
    form: FormFields,
) -> ApiResult<Json<SeparateResponse>> {
    let beat_id = form
        .text("beatId")
        .ok_or_else(|| ApiError::validation("beatId required"))?
        .to_string();

    // The archive key is also the public URL path
    let key = stems_key(&beat_id);
    validate_key(&key).map_err(|_| {
        ApiError::validation("beatId may not contain empty, \".\" or \"..\" path segments")
    })?;

    let source = InputSource::select(
        form.file("file").map(|f| f.data.clone()),
        form.text("fileUrl"),
    )
    .ok_or_else(|| ApiError::validation("No file or URL provided"))?;

    let origin = match &source {
        InputSource::Upload(_) => "upload",
        InputSource::Url(_) => "url",
    };
    tracing::info!(beat_id = %beat_id, source = origin, "Separation requested");

    match run_separation(&state, &beat_id, &key, &source).await {
        Ok(stems_zip_url) => {
            tracing::info!(beat_id = %beat_id, url = %stems_zip_url, "Stems published");
            state
                .callback
                .notify(&CallbackPayload::completed(&beat_id, &stems_zip_url))
                .await;
            Ok(Json(SeparateResponse {
                ok: true,
                stems_zip_url,
            }))
        }
        Err(e) => {
            state
                .callback
                .notify(&CallbackPayload::failed(&beat_id, &e))
                .await;
            Err(e)
        }
    }
}

async fn run_separation(
    state: &AppState,
    beat_id: &str,
    key: &str,
    source: &InputSource,
) -> ApiResult<String> {
    let work = scratch_dir(state.scratch_root.as_deref(), "separate")?;
    let input = work.path().join("input.wav");
    let stems_dir = work.path().join("stems");
    let archive = work.path().join("stems.zip");

    state.fetcher.fetch(source, &input).await?;

    let stems = state.separator.separate(&input, &stems_dir).await?;
    tracing::debug!(
        beat_id = %beat_id,
        separator = state.separator.name(),
        stems = stems.len(),
        "Stems produced"
    );

    packager::zip_directory(&stems_dir, &archive).await?;

    let uploaded = state
        .uploader
        .publish(&archive, key, ZIP_CONTENT_TYPE)
        .await?;
    Ok(uploaded.public_url)
}

pub fn separate_routes() -> Router<AppState> {
    Router::new().route("/api/separate", post(separate))
}
