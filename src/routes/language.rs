use axum::{
    http::header,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::{
    middleware::language::{preference_cookie, RequestLanguage, LANG_COOKIE},
    models::language::Language,
};

#[derive(Debug, Deserialize)]
pub struct SetLanguageRequest {
    pub language: Language,
}

/// GET /api/language: supported languages and the one resolved for this request.
pub async fn current_language(RequestLanguage(language): RequestLanguage) -> Json<Value> {
    Json(json!({
        "current": language,
        "supported": Language::ALL,
        "default": Language::default(),
    }))
}

/// POST /api/language: persists the choice in the `lang` cookie.
pub async fn set_language(Json(body): Json<SetLanguageRequest>) -> impl IntoResponse {
    (
        [(header::SET_COOKIE, preference_cookie(LANG_COOKIE, body.language.code()))],
        Json(json!({ "language": body.language })),
    )
}
