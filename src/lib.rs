pub mod config;
pub mod db;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method},
    routing::{delete, get, post, put},
    Router,
};
use sqlx::PgPool;
use tower_http::cors::{AllowHeaders, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use config::Config;
use middleware::auth::JwtSecret;
use services::{email::EmailService, i18n::TranslationStore, realtime::ChangeFeed};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    /// Absent when `REDIS_URL` is unset: no rate limiting, local-only change feed.
    pub redis: Option<redis::aio::MultiplexedConnection>,
    pub config: Arc<Config>,
    pub translations: Arc<TranslationStore>,
    pub feed: Arc<ChangeFeed>,
    pub email: Option<Arc<EmailService>>,
}

/// Browser origins allowed to call the API: localhost always, plus `ALLOWED_ORIGINS`.
fn cors_layer(allowed: Vec<String>) -> CorsLayer {
    let origin = AllowOrigin::predicate(move |origin: &HeaderValue, _| {
        let Ok(o) = origin.to_str() else {
            return false;
        };
        o.starts_with("http://localhost")
            || o.starts_with("http://127.0.0.1")
            || allowed.iter().any(|a| a == o)
    });

    CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers(AllowHeaders::list([
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            header::ACCEPT,
            header::ACCEPT_LANGUAGE,
        ]))
        .allow_origin(origin)
        .allow_credentials(true)
}

pub fn build_router(state: AppState) -> Router {
    let jwt_secret = JwtSecret(state.config.jwt_secret.clone());
    let cors = cors_layer(state.config.allowed_origins.clone());

    Router::new()
        .route("/health", get(routes::health::health_check))
        .route("/metrics", get(routes::metrics::metrics_handler))
        .route("/realtime", get(routes::realtime::ws_handler))
        .route("/storage/{*path}", get(routes::storage::serve_file))
        // Language & translations
        .route("/api/language", get(routes::language::current_language).post(routes::language::set_language))
        .route("/api/translations/{lang}", get(routes::translations::get_catalog))
        .route("/api/translations/{lang}/lookup", get(routes::translations::lookup))
        // Pages
        .route("/api/pages/{page_key}", get(routes::pages::get_page))
        .route("/api/pages/{page_key}/{section_key}", get(routes::pages::get_section))
        // Episodes
        .route("/api/episodes", get(routes::episodes::list_episodes))
        .route("/api/episodes/counts", get(routes::episodes::category_counts))
        .route("/api/episodes/{id}", get(routes::episodes::get_episode))
        // Forms
        .route("/api/guest-requests", post(routes::forms::submit_guest_request))
        .route("/api/newsletter", post(routes::forms::subscribe_newsletter))
        .route("/api/consents", post(routes::forms::record_cookie_consent))
        // Auth
        .route("/api/auth/sign-up", post(routes::auth::sign_up))
        .route("/api/auth/sign-in", post(routes::auth::sign_in))
        .route("/api/auth/refresh", post(routes::auth::refresh_token))
        .route("/api/auth/sign-out", post(routes::auth::sign_out))
        .route("/api/auth/session", get(routes::auth::session))
        // Admin: translations
        .route("/api/admin/translations", get(routes::translations::list_translations).put(routes::translations::upsert_translation))
        .route("/api/admin/translations/reload", post(routes::translations::reload_translations))
        .route("/api/admin/translations/{lang}/{key}", delete(routes::translations::delete_translation))
        // Admin: content
        .route("/api/admin/content", get(routes::content::list_content).put(routes::content::upsert_content))
        .route("/api/admin/content/{id}", delete(routes::content::delete_content))
        .route("/api/admin/content/{id}/publish", put(routes::content::set_content_published))
        .route("/api/admin/uploads", post(routes::content::upload_image))
        // Admin: episodes
        .route("/api/admin/episodes", get(routes::episodes::admin_list_episodes).post(routes::episodes::create_episode))
        .route("/api/admin/episodes/{id}", put(routes::episodes::replace_episode).delete(routes::episodes::delete_episode))
        .route("/api/admin/episodes/{id}/publish", put(routes::episodes::set_episode_published))
        // Admin: forms
        .route("/api/admin/guest-requests", get(routes::forms::list_guest_requests))
        .route("/api/admin/guest-requests/{id}/status", put(routes::forms::update_guest_request_status))
        .route("/api/admin/newsletter", get(routes::forms::list_subscribers))
        .route("/api/admin/newsletter/export", get(routes::forms::export_subscribers))
        .route("/api/admin/newsletter/{id}", delete(routes::forms::delete_subscriber))
        // Admin: inspector
        .route("/api/admin/database-inspector", get(routes::inspector::database_inspector))
        // Super admin
        .route("/api/admin/users", get(routes::users::list_users))
        .route("/api/admin/users/{id}/role", put(routes::users::update_role))
        .fallback(routes::fallback)
        .layer(axum::Extension(jwt_secret))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        // Uploads are capped at 10 MB by the storage service; leave room for multipart framing
        .layer(DefaultBodyLimit::max(12 * 1024 * 1024))
        .with_state(state)
}
