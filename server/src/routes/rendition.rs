use axum::{
    extract::{Query, State},
    routing::{get, post},
    Json, Router,
};
use camino::{Utf8Path as Path, Utf8PathBuf as PathBuf};
use ddam_core::Rendition;
use serde::{Deserialize, Serialize};

use crate::{
    app_state::{AppState, SharedState},
    http_error::{ApiResult, HttpError},
};

use super::run_blocking;

pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/", get(get_rendition))
        .route("/purge", post(post_purge))
}

#[derive(Debug, Deserialize)]
struct RenditionQuery {
    /// Storage key of the original.
    file: String,
}

#[derive(Debug, Deserialize)]
struct PurgeRequest {
    files: Vec<String>,
}

#[derive(Debug, Serialize)]
struct PurgeResponse {
    purged: usize,
}

#[tracing::instrument(skip(app_state))]
async fn get_rendition(
    Query(query): Query<RenditionQuery>,
    State(app_state): State<SharedState>,
) -> ApiResult<Json<Option<Rendition>>> {
    let original = original_path(&app_state, &query.file)?;
    let is_file = tokio::fs::metadata(&original)
        .await
        .map(|meta| meta.is_file())
        .unwrap_or(false);
    if !is_file {
        return Err(HttpError::NotFound(format!("no such file '{}'", query.file)));
    }
    let state = app_state.clone();
    let rendition = run_blocking(move || state.renditions.get(&original)).await??;
    Ok(Json(rendition))
}

#[tracing::instrument(skip_all)]
async fn post_purge(
    State(app_state): State<SharedState>,
    Json(request): Json<PurgeRequest>,
) -> ApiResult<Json<PurgeResponse>> {
    let originals: Vec<PathBuf> = request
        .files
        .iter()
        .map(|key| original_path(&app_state, key))
        .collect::<ApiResult<_>>()?;
    let state = app_state.clone();
    let purged = run_blocking(move || {
        state
            .renditions
            .purge(originals.iter().map(|path| path.as_path()))
    })
    .await?;
    Ok(Json(PurgeResponse { purged }))
}

/// Only uploaded originals have renditions, anything else under the media root
/// (renditions included) is treated as unknown.
fn original_path(app_state: &AppState, key: &str) -> ApiResult<PathBuf> {
    if !Path::new(key).starts_with(&app_state.config.media.upload_dir) {
        return Err(HttpError::NotFound(format!("'{}' is not an uploaded file", key)));
    }
    Ok(app_state.storage.path_on_disk(key)?)
}
