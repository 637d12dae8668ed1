use axum::{extract::State, http::StatusCode, Json};
use serde_json::{json, Value};

use crate::AppState;

/// GET /health: 503 while the database is unreachable. Redis is optional and
/// only reported.
pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    let redis = if state.redis.is_some() { "configured" } else { "disabled" };

    match sqlx::query("SELECT 1").execute(&state.db).await {
        Ok(_) => (
            StatusCode::OK,
            Json(json!({ "status": "ok", "db": "connected", "redis": redis })),
        ),
        Err(e) => {
            tracing::warn!("health check: database unreachable: {e}");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "status": "degraded", "db": "unreachable", "redis": redis })),
            )
        }
    }
}
