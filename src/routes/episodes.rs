use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde_json::json;
use uuid::Uuid;

use crate::{
    middleware::language::RequestLanguage,
    models::{
        auth::AdminUser,
        content::PublishRequest,
        episode::{
            CategoryCounts, EpisodeGroup, EpisodeListQuery, EpisodeRow, EpisodeView,
            SaveEpisodeRequest,
        },
        language::Language,
    },
    routes::{bad_request, internal_error, not_found, ApiError},
    services::{
        audit::{self, AuditEntry},
        episodes::{count_by_category, group_variants, to_view, validate_variants, EpisodeService},
        metrics,
        realtime::{ChangeKind, ChangeTable},
    },
    AppState,
};

/// Published episodes for a language. A failing query yields an empty list.
async fn published_views(state: &AppState, language: Language) -> Vec<EpisodeView> {
    match EpisodeService::list_published(&state.db, language).await {
        Ok(rows) => rows.iter().map(to_view).collect(),
        Err(e) => {
            tracing::warn!("episodes for {language} unavailable: {e}");
            Vec::new()
        }
    }
}

/// GET /api/episodes?category=
pub async fn list_episodes(
    State(state): State<AppState>,
    RequestLanguage(language): RequestLanguage,
    Query(query): Query<EpisodeListQuery>,
) -> Json<Vec<EpisodeView>> {
    let mut views = published_views(&state, language).await;
    if let Some(category) = query.category {
        views.retain(|v| v.category == category);
    }
    Json(views)
}

/// GET /api/episodes/counts
pub async fn category_counts(
    State(state): State<AppState>,
    RequestLanguage(language): RequestLanguage,
) -> Json<CategoryCounts> {
    let views = published_views(&state, language).await;
    Json(count_by_category(&views))
}

/// GET /api/episodes/{id}
pub async fn get_episode(
    State(state): State<AppState>,
    RequestLanguage(language): RequestLanguage,
    Path(id): Path<Uuid>,
) -> Result<Json<EpisodeView>, ApiError> {
    let row = EpisodeService::get_published(&state.db, id, language)
        .await
        .map_err(internal_error)?
        .ok_or_else(not_found)?;
    Ok(Json(to_view(&row)))
}

/// GET /api/admin/episodes
pub async fn admin_list_episodes(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> Result<Json<Vec<EpisodeGroup>>, ApiError> {
    let rows = EpisodeService::list_all(&state.db)
        .await
        .map_err(internal_error)?;
    Ok(Json(group_variants(rows)))
}

async fn announce(state: &AppState, kind: ChangeKind, rows: &[EpisodeRow]) {
    for row in rows {
        state
            .feed
            .publish(ChangeTable::Episodes, kind, json!(row))
            .await;
    }
}

fn episode_label(rows: &[EpisodeRow]) -> Option<String> {
    rows.first().map(|r| r.title.clone())
}

/// POST /api/admin/episodes
pub async fn create_episode(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Json(body): Json<SaveEpisodeRequest>,
) -> Result<(StatusCode, Json<EpisodeGroup>), ApiError> {
    validate_variants(&body.variants).map_err(bad_request)?;

    let rows = EpisodeService::create(&state.db, &body.variants)
        .await
        .map_err(internal_error)?;

    announce(&state, ChangeKind::Insert, &rows).await;
    metrics::CONTENT_WRITES
        .with_label_values(&["episodes", "create"])
        .inc();
    audit::log(
        state.db.clone(),
        AuditEntry {
            actor_id: admin.user_id,
            action: "episode.create",
            resource_type: "episode",
            resource_id: rows.first().map(|r| r.id.to_string()),
            resource_label: episode_label(&rows),
        },
    );

    let group = group_variants(rows)
        .into_iter()
        .next()
        .ok_or_else(|| internal_error(anyhow::anyhow!("created episode has no variants")))?;
    Ok((StatusCode::CREATED, Json(group)))
}

/// PUT /api/admin/episodes/{id}: replaces every language variant.
pub async fn replace_episode(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<Uuid>,
    Json(body): Json<SaveEpisodeRequest>,
) -> Result<Json<EpisodeGroup>, ApiError> {
    validate_variants(&body.variants).map_err(bad_request)?;

    let rows = EpisodeService::replace(&state.db, id, &body.variants)
        .await
        .map_err(internal_error)?
        .ok_or_else(not_found)?;

    announce(&state, ChangeKind::Update, &rows).await;
    metrics::CONTENT_WRITES
        .with_label_values(&["episodes", "replace"])
        .inc();
    audit::log(
        state.db.clone(),
        AuditEntry {
            actor_id: admin.user_id,
            action: "episode.replace",
            resource_type: "episode",
            resource_id: Some(id.to_string()),
            resource_label: episode_label(&rows),
        },
    );

    group_variants(rows)
        .into_iter()
        .next()
        .map(Json)
        .ok_or_else(not_found)
}

/// PUT /api/admin/episodes/{id}/publish
pub async fn set_episode_published(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<Uuid>,
    Json(body): Json<PublishRequest>,
) -> Result<StatusCode, ApiError> {
    let changed =
        EpisodeService::set_published(&state.db, id, body.is_published, body.language_code)
            .await
            .map_err(internal_error)?;
    if changed == 0 {
        return Err(not_found());
    }

    state
        .feed
        .publish(
            ChangeTable::Episodes,
            ChangeKind::Update,
            json!({
                "id": id,
                "language_code": body.language_code,
                "is_published": body.is_published,
            }),
        )
        .await;
    metrics::CONTENT_WRITES
        .with_label_values(&["episodes", "publish"])
        .inc();
    audit::log(
        state.db.clone(),
        AuditEntry {
            actor_id: admin.user_id,
            action: if body.is_published { "episode.publish" } else { "episode.unpublish" },
            resource_type: "episode",
            resource_id: Some(id.to_string()),
            resource_label: body.language_code.map(|l| l.to_string()),
        },
    );

    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /api/admin/episodes/{id}
pub async fn delete_episode(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let deleted = EpisodeService::delete(&state.db, id)
        .await
        .map_err(internal_error)?;
    if deleted == 0 {
        return Err(not_found());
    }

    state
        .feed
        .publish(ChangeTable::Episodes, ChangeKind::Delete, json!({ "id": id }))
        .await;
    metrics::CONTENT_WRITES
        .with_label_values(&["episodes", "delete"])
        .inc();
    audit::log(
        state.db.clone(),
        AuditEntry {
            actor_id: admin.user_id,
            action: "episode.delete",
            resource_type: "episode",
            resource_id: Some(id.to_string()),
            resource_label: None,
        },
    );

    Ok(StatusCode::NO_CONTENT)
}
