use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
};

use crate::{services::storage::resolve_stored_path, AppState};

/// GET /storage/{*path}: serves uploaded files from the media directory.
pub async fn serve_file(
    State(state): State<AppState>,
    Path(path): Path<String>,
) -> Result<impl IntoResponse, StatusCode> {
    let file = resolve_stored_path(&state.config.media_dir, &path).ok_or(StatusCode::NOT_FOUND)?;
    let bytes = tokio::fs::read(&file).await.map_err(|e| {
        tracing::warn!("stored file {path} unreadable: {e}");
        StatusCode::NOT_FOUND
    })?;
    let mime = mime_guess::from_path(&file).first_or_octet_stream();

    Ok((
        [
            (header::CONTENT_TYPE, mime.to_string()),
            (header::CACHE_CONTROL, "public, max-age=31536000, immutable".to_string()),
        ],
        bytes,
    ))
}
