use std::io::Cursor;

use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Multipart, State},
    http::{HeaderMap, StatusCode},
    routing::post,
    Json, Router,
};
use ddam_core::{intake, model::Asset, UploadedFile};

use crate::{
    app_state::SharedState,
    http_error::{ApiResult, HttpError},
};

use super::run_blocking;

/// Header set by the authenticating proxy in front of the server.
pub const REMOTE_USER_HEADER: &str = "x-remote-user";

const FILE_FIELD: &str = "file";

/// Uploads are cut off at this many times the configured maximum file size.
const BODY_LIMIT_FACTOR: u64 = 8;

pub fn router(max_file_size: u64) -> Router<SharedState> {
    let body_limit: usize = max_file_size
        .saturating_mul(BODY_LIMIT_FACTOR)
        .try_into()
        .unwrap_or(usize::MAX);
    Router::new()
        .route("/", post(post_upload))
        .layer(DefaultBodyLimit::max(body_limit))
}

#[tracing::instrument(skip_all)]
async fn post_upload(
    State(app_state): State<SharedState>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> ApiResult<(StatusCode, Json<Vec<Asset>>)> {
    let uploaded_by = headers
        .get(REMOTE_USER_HEADER)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_owned();

    let mut uploads: Vec<UploadedFile<Cursor<Bytes>>> = Vec::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| HttpError::BadRequest(err.body_text()))?
    {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        let name = field.file_name().unwrap_or_default().to_owned();
        let content = field
            .bytes()
            .await
            .map_err(|err| HttpError::BadRequest(err.body_text()))?;
        uploads.push(UploadedFile::new(name, content.len() as u64, Cursor::new(content)));
    }
    if uploads.is_empty() {
        return Err(HttpError::BadRequest(format!(
            "no '{}' field in upload",
            FILE_FIELD
        )));
    }
    tracing::info!(count = uploads.len(), %uploaded_by, "received upload");

    let state = app_state.clone();
    let assets = run_blocking(move || {
        intake::ingest_all(
            &state.validator,
            &state.storage,
            &state.config.media.upload_dir,
            &mut uploads,
            &uploaded_by,
        )
    })
    .await??;
    Ok((StatusCode::CREATED, Json(assets)))
}
