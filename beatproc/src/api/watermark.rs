//! Watermark endpoint
//!
//! POST /api/watermark: download the beat and the voice tag, mix the tag in
//! at every interval, publish the MP3 under a fresh name.

use axum::{extract::State, routing::post, Json, Router};
use beatproc_common::scratch::scratch_dir;
use serde::Serialize;
use uuid::Uuid;

use super::form::FormFields;
use crate::{
    error::{ApiError, ApiResult},
    services::uploader::{watermark_key, MP3_CONTENT_TYPE},
    AppState,
};

/// POST /api/watermark response
#[derive(Debug, Serialize)]
pub struct WatermarkResponse {
    pub ok: bool,
    pub url: String,
}

/// POST /api/watermark
///
/// Form fields: `fileUrl` and `tagUrl`, both required.
pub async fn watermark(
    State(state): State<AppState>,
    form: FormFields,
) -> ApiResult<Json<WatermarkResponse>> {
    let (Some(file_url), Some(tag_url)) = (form.text("fileUrl"), form.text("tagUrl")) else {
        return Err(ApiError::validation("Missing fileUrl or tagUrl"));
    };

    tracing::info!(file_url = %file_url, tag_url = %tag_url, "Watermark requested");

    let work = scratch_dir(state.scratch_root.as_deref(), "watermark")?;
    let source = work.path().join("source.mp3");
    let tag = work.path().join("tag.wav");

    tokio::try_join!(
        state.fetcher.download(file_url, &source),
        state.fetcher.download(tag_url, &tag),
    )?;

    let file_name = format!("{}.mp3", Uuid::new_v4());
    let output = work.path().join(&file_name);
    let plan = state.watermarker.apply(&source, &tag, &output).await?;

    let uploaded = state
        .uploader
        .publish(&output, &watermark_key(&file_name), MP3_CONTENT_TYPE)
        .await?;

    tracing::info!(
        key = %uploaded.key,
        insertions = plan.offsets.len(),
        "Watermarked audio published"
    );

    Ok(Json(WatermarkResponse {
        ok: true,
        url: uploaded.public_url,
    }))
}

pub fn watermark_routes() -> Router<AppState> {
    Router::new().route("/api/watermark", post(watermark))
}
