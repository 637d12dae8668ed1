use axum::{extract::State, Json};

use crate::{
    models::auth::AdminUser,
    routes::{internal_error, ApiError},
    services::inspector::{InspectorReport, InspectorService},
    AppState,
};

/// GET /api/admin/database-inspector
pub async fn database_inspector(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> Result<Json<InspectorReport>, ApiError> {
    InspectorService::report(&state.db)
        .await
        .map(Json)
        .map_err(internal_error)
}
