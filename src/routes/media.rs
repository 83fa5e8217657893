use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};

use crate::error::AppResult;
use crate::state::AppState;
use crate::storage;

/// Serve an uploaded file from whichever backend holds it.
pub async fn serve(State(state): State<AppState>, Path(path): Path<String>) -> AppResult<Response> {
    let bytes = state.storage.open(&path).await?;
    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, storage::content_type(&path)),
            (header::CACHE_CONTROL, "public, max-age=86400".to_string()),
            (header::X_CONTENT_TYPE_OPTIONS, "nosniff".to_string()),
        ],
        bytes,
    )
        .into_response())
}
