use axum::{
    extract::{Path, State},
    Json,
};

use crate::{
    middleware::language::RequestLanguage,
    models::{
        content::{PageKey, PageView, SectionView},
        language::Language,
    },
    routes::{not_found, ApiError},
    services::{content::ContentService, pages::compose_page},
    AppState,
};

/// Compose a page for visitors. A failing content query degrades to the
/// default copy instead of an error.
async fn load_page(state: &AppState, page: PageKey, language: Language) -> PageView {
    let rows = match ContentService::list_published(&state.db, page, language).await {
        Ok(rows) => rows,
        Err(e) => {
            tracing::warn!("content for {page}/{language} unavailable, serving defaults: {e}");
            Vec::new()
        }
    };
    let catalog = state.translations.catalog(&state.db, language).await;
    compose_page(page, language, &rows, &catalog)
}

/// GET /api/pages/{page_key}
pub async fn get_page(
    State(state): State<AppState>,
    RequestLanguage(language): RequestLanguage,
    Path(page_key): Path<String>,
) -> Result<Json<PageView>, ApiError> {
    let page: PageKey = page_key.parse().map_err(|_| not_found())?;
    Ok(Json(load_page(&state, page, language).await))
}

/// GET /api/pages/{page_key}/{section_key}
pub async fn get_section(
    State(state): State<AppState>,
    RequestLanguage(language): RequestLanguage,
    Path((page_key, section_key)): Path<(String, String)>,
) -> Result<Json<SectionView>, ApiError> {
    let page: PageKey = page_key.parse().map_err(|_| not_found())?;
    let view = load_page(&state, page, language).await;
    view.sections
        .into_iter()
        .find(|s| s.section_key == section_key)
        .map(Json)
        .ok_or_else(not_found)
}
