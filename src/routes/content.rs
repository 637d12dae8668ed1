use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    Json,
};
use serde_json::json;
use uuid::Uuid;

use crate::{
    models::{
        auth::AdminUser,
        content::{ContentQuery, ContentRow, PageKey, PublishRequest, UploadedMedia, UpsertContentRequest},
    },
    routes::{bad_request, internal_error, not_found, ApiError},
    services::{
        audit::{self, AuditEntry},
        content::{is_valid_key, ContentService},
        metrics,
        realtime::{ChangeKind, ChangeTable},
        storage::StorageService,
    },
    AppState,
};

fn content_label(row: &ContentRow) -> String {
    format!("{}.{}:{}", row.page_key, row.section_key, row.language_code)
}

/// GET /api/admin/content?page_key=&language=
pub async fn list_content(
    State(state): State<AppState>,
    _admin: AdminUser,
    Query(query): Query<ContentQuery>,
) -> Result<Json<Vec<ContentRow>>, ApiError> {
    ContentService::list_all(&state.db, query.page_key.as_deref(), query.language)
        .await
        .map(Json)
        .map_err(internal_error)
}

/// PUT /api/admin/content
pub async fn upsert_content(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Json(body): Json<UpsertContentRequest>,
) -> Result<Json<ContentRow>, ApiError> {
    body.page_key.trim().parse::<PageKey>().map_err(bad_request)?;
    if !is_valid_key(body.section_key.trim()) {
        return Err(bad_request("Invalid section key"));
    }

    let (row, inserted) = ContentService::upsert(&state.db, &body)
        .await
        .map_err(internal_error)?;

    let kind = if inserted { ChangeKind::Insert } else { ChangeKind::Update };
    state.feed.publish(ChangeTable::Content, kind, json!(row)).await;

    metrics::CONTENT_WRITES
        .with_label_values(&["content", "upsert"])
        .inc();
    audit::log(
        state.db.clone(),
        AuditEntry {
            actor_id: admin.user_id,
            action: "content.upsert",
            resource_type: "content",
            resource_id: Some(row.id.to_string()),
            resource_label: Some(content_label(&row)),
        },
    );

    Ok(Json(row))
}

/// PUT /api/admin/content/{id}/publish
pub async fn set_content_published(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<Uuid>,
    Json(body): Json<PublishRequest>,
) -> Result<Json<ContentRow>, ApiError> {
    let row = ContentService::set_published(&state.db, id, body.is_published)
        .await
        .map_err(internal_error)?
        .ok_or_else(not_found)?;

    state
        .feed
        .publish(ChangeTable::Content, ChangeKind::Update, json!(row))
        .await;
    metrics::CONTENT_WRITES
        .with_label_values(&["content", "publish"])
        .inc();
    audit::log(
        state.db.clone(),
        AuditEntry {
            actor_id: admin.user_id,
            action: if body.is_published { "content.publish" } else { "content.unpublish" },
            resource_type: "content",
            resource_id: Some(row.id.to_string()),
            resource_label: Some(content_label(&row)),
        },
    );

    Ok(Json(row))
}

/// DELETE /api/admin/content/{id}
pub async fn delete_content(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let row = ContentService::delete(&state.db, id)
        .await
        .map_err(internal_error)?
        .ok_or_else(not_found)?;

    state
        .feed
        .publish(ChangeTable::Content, ChangeKind::Delete, json!(row))
        .await;
    metrics::CONTENT_WRITES
        .with_label_values(&["content", "delete"])
        .inc();
    audit::log(
        state.db.clone(),
        AuditEntry {
            actor_id: admin.user_id,
            action: "content.delete",
            resource_type: "content",
            resource_id: Some(row.id.to_string()),
            resource_label: Some(content_label(&row)),
        },
    );

    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/admin/uploads (multipart, field `file`)
pub async fn upload_image(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    multipart: Multipart,
) -> Result<(StatusCode, Json<UploadedMedia>), ApiError> {
    let media = match StorageService::save_content_image(&state.config, multipart).await {
        Ok(media) => media,
        Err(e) => {
            metrics::UPLOADS.with_label_values(&["rejected"]).inc();
            // disk failures are ours, everything else is a bad upload
            if e.downcast_ref::<std::io::Error>().is_some() {
                return Err(internal_error(e));
            }
            return Err(bad_request(e));
        }
    };

    metrics::UPLOADS.with_label_values(&["stored"]).inc();
    audit::log(
        state.db.clone(),
        AuditEntry {
            actor_id: admin.user_id,
            action: "content.upload",
            resource_type: "media",
            resource_id: None,
            resource_label: Some(media.storage_path.clone()),
        },
    );

    Ok((StatusCode::CREATED, Json(media)))
}
