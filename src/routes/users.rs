use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde_json::json;
use uuid::Uuid;

use crate::{
    models::{
        auth::SuperAdminUser,
        user::{SessionView, UpdateRoleRequest},
    },
    routes::{internal_error, not_found, ApiError},
    services::{
        audit::{self, AuditEntry},
        auth::AuthService,
    },
    AppState,
};

/// GET /api/admin/users
pub async fn list_users(
    State(state): State<AppState>,
    _super_admin: SuperAdminUser,
) -> Result<Json<Vec<SessionView>>, ApiError> {
    AuthService::list_profiles(&state.db)
        .await
        .map(Json)
        .map_err(internal_error)
}

/// PUT /api/admin/users/{id}/role
pub async fn update_role(
    State(state): State<AppState>,
    SuperAdminUser(actor): SuperAdminUser,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateRoleRequest>,
) -> Result<Json<SessionView>, ApiError> {
    // super admins cannot demote themselves
    if id == actor.user_id && !body.role.is_super_admin() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "Cannot remove your own super admin role" })),
        ));
    }

    let session = AuthService::set_role(&state.db, id, body.role)
        .await
        .map_err(internal_error)?
        .ok_or_else(not_found)?;

    audit::log(
        state.db.clone(),
        AuditEntry {
            actor_id: actor.user_id,
            action: "user.role_changed",
            resource_type: "user",
            resource_id: Some(id.to_string()),
            resource_label: Some(format!("{} -> {}", session.email, session.role)),
        },
    );

    Ok(Json(session))
}
