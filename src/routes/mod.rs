pub mod auth;
pub mod content;
pub mod episodes;
pub mod forms;
pub mod health;
pub mod inspector;
pub mod language;
pub mod metrics;
pub mod pages;
pub mod realtime;
pub mod storage;
pub mod translations;
pub mod users;

use axum::{http::StatusCode, Json};
use serde_json::{json, Value};

/// Error shape shared by every handler: status plus `{"error": ...}`.
pub type ApiError = (StatusCode, Json<Value>);

pub fn internal_error(e: anyhow::Error) -> ApiError {
    tracing::error!("request failed: {e:#}");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": "Internal server error" })),
    )
}

pub fn bad_request(message: impl std::fmt::Display) -> ApiError {
    (StatusCode::BAD_REQUEST, Json(json!({ "error": message.to_string() })))
}

pub fn not_found() -> ApiError {
    (StatusCode::NOT_FOUND, Json(json!({ "error": "not found" })))
}

/// Catch-all for unknown paths.
pub async fn fallback() -> ApiError {
    not_found()
}
