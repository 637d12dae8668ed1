use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};

use crate::{
    models::{
        auth::AdminUser,
        language::Language,
        translation::{
            CatalogResponse, LookupQuery, TranslationQuery, TranslationRow,
            UpsertTranslationRequest,
        },
    },
    routes::{bad_request, internal_error, not_found, ApiError},
    services::{
        audit::{self, AuditEntry},
        metrics,
        realtime::{ChangeKind, ChangeTable},
        translations::{is_valid_key, TranslationService},
    },
    AppState,
};

fn parse_language(code: &str) -> Result<Language, ApiError> {
    code.parse::<Language>().map_err(bad_request)
}

/// GET /api/translations/{lang}
pub async fn get_catalog(
    State(state): State<AppState>,
    Path(lang): Path<String>,
) -> Result<Json<CatalogResponse>, ApiError> {
    let language = parse_language(&lang)?;
    let catalog = state.translations.catalog(&state.db, language).await;
    Ok(Json(CatalogResponse {
        language,
        source: catalog.source,
        entries: catalog.entries(),
    }))
}

/// GET /api/translations/{lang}/lookup?key=...
pub async fn lookup(
    State(state): State<AppState>,
    Path(lang): Path<String>,
    Query(query): Query<LookupQuery>,
) -> Result<Json<Value>, ApiError> {
    let language = parse_language(&lang)?;
    let catalog = state.translations.catalog(&state.db, language).await;
    Ok(Json(json!({ "key": query.key, "value": catalog.t(&query.key) })))
}

/// GET /api/admin/translations?language=
pub async fn list_translations(
    State(state): State<AppState>,
    _admin: AdminUser,
    Query(query): Query<TranslationQuery>,
) -> Result<Json<Vec<TranslationRow>>, ApiError> {
    TranslationService::list(&state.db, query.language)
        .await
        .map(Json)
        .map_err(internal_error)
}

/// PUT /api/admin/translations
pub async fn upsert_translation(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Json(body): Json<UpsertTranslationRequest>,
) -> Result<Json<TranslationRow>, ApiError> {
    if !is_valid_key(body.key.trim()) {
        return Err(bad_request("Invalid translation key"));
    }

    let (row, inserted) = TranslationService::upsert(&state.db, &body)
        .await
        .map_err(internal_error)?;

    let kind = if inserted { ChangeKind::Insert } else { ChangeKind::Update };
    state
        .feed
        .publish(ChangeTable::Translations, kind, json!(row))
        .await;

    metrics::CONTENT_WRITES
        .with_label_values(&["translations", "upsert"])
        .inc();
    audit::log(
        state.db.clone(),
        AuditEntry {
            actor_id: admin.user_id,
            action: "translation.upsert",
            resource_type: "translation",
            resource_id: Some(row.id.to_string()),
            resource_label: Some(format!("{}:{}", row.language_code, row.key)),
        },
    );

    Ok(Json(row))
}

/// DELETE /api/admin/translations/{lang}/{key}
pub async fn delete_translation(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path((lang, key)): Path<(String, String)>,
) -> Result<StatusCode, ApiError> {
    let language = parse_language(&lang)?;
    let row = TranslationService::delete(&state.db, language, &key)
        .await
        .map_err(internal_error)?
        .ok_or_else(not_found)?;

    state
        .feed
        .publish(ChangeTable::Translations, ChangeKind::Delete, json!(row))
        .await;

    metrics::CONTENT_WRITES
        .with_label_values(&["translations", "delete"])
        .inc();
    audit::log(
        state.db.clone(),
        AuditEntry {
            actor_id: admin.user_id,
            action: "translation.delete",
            resource_type: "translation",
            resource_id: Some(row.id.to_string()),
            resource_label: Some(format!("{}:{}", row.language_code, row.key)),
        },
    );

    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/admin/translations/reload: drop cached catalogs and refetch.
pub async fn reload_translations(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> Json<Value> {
    let mut sources = serde_json::Map::new();
    for language in Language::ALL {
        let catalog = state.translations.reload(&state.db, language).await;
        sources.insert(language.code().to_string(), json!(catalog.source));
    }
    Json(json!({ "sources": sources }))
}
