//! Tests against a real schema. `#[sqlx::test]` creates a fresh database per
//! test from `DATABASE_URL` and applies ./migrations, so these are ignored by
//! default; run them with `cargo test -- --ignored` against a Postgres server.

use sqlx::PgPool;
use uuid::Uuid;

use podcast_cms_api::{
    config::Config,
    models::{
        content::{PageKey, UpsertContentRequest},
        episode::EpisodeVariantInput,
        language::Language,
    },
    services::{
        auth::{AuthError, AuthService},
        content::ContentService,
        episodes::EpisodeService,
    },
};

fn test_config() -> Config {
    Config {
        database_url: String::new(),
        redis_url: None,
        jwt_secret: "test-secret".into(),
        jwt_refresh_secret: "test-refresh-secret".into(),
        jwt_expiry_seconds: 900,
        jwt_refresh_expiry_days: 30,
        media_dir: std::env::temp_dir().to_string_lossy().into_owned(),
        public_base_url: "http://localhost:8080".into(),
        host: "127.0.0.1".into(),
        port: 0,
        allowed_origins: vec![],
        bootstrap_super_admin_email: None,
        smtp_host: None,
        smtp_port: None,
        smtp_username: None,
        smtp_password: None,
        smtp_from: None,
        contact_inbox: None,
    }
}

fn hero(text: &str, is_published: bool) -> UpsertContentRequest {
    UpsertContentRequest {
        page_key: "home".into(),
        section_key: "hero_title".into(),
        language_code: Language::En,
        content_text: Some(text.into()),
        content_html: None,
        media_url: None,
        media_type: None,
        is_published,
    }
}

fn variant(language: Language, title: &str) -> EpisodeVariantInput {
    EpisodeVariantInput {
        language_code: language,
        title: title.into(),
        description: None,
        youtube_url: None,
        category: Some("podcast".into()),
        episode_number: Some(1),
        is_published: true,
    }
}

// =============================================================================
// Content
// =============================================================================

#[sqlx::test(migrations = "./migrations")]
#[ignore = "needs DATABASE_URL"]
async fn upsert_same_triple_overwrites(pool: PgPool) {
    let (first, inserted) = ContentService::upsert(&pool, &hero("Welcome", true))
        .await
        .unwrap();
    assert!(inserted);

    let (second, inserted) = ContentService::upsert(&pool, &hero("Stories from the table", true))
        .await
        .unwrap();
    assert!(!inserted);
    assert_eq!(second.id, first.id);

    let rows = ContentService::list_all(&pool, Some("home"), Some(Language::En))
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].content_text.as_deref(), Some("Stories from the table"));
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "needs DATABASE_URL"]
async fn unpublished_content_is_admin_only(pool: PgPool) {
    let (row, _) = ContentService::upsert(&pool, &hero("Welcome", true))
        .await
        .unwrap();
    let public = ContentService::list_published(&pool, PageKey::Home, Language::En)
        .await
        .unwrap();
    assert_eq!(public.len(), 1);

    ContentService::set_published(&pool, row.id, false)
        .await
        .unwrap()
        .expect("row exists");

    let public = ContentService::list_published(&pool, PageKey::Home, Language::En)
        .await
        .unwrap();
    assert!(public.is_empty());

    let admin = ContentService::list_all(&pool, Some("home"), None).await.unwrap();
    assert_eq!(admin.len(), 1);
    assert!(!admin[0].is_published);
}

// =============================================================================
// Episodes
// =============================================================================

#[sqlx::test(migrations = "./migrations")]
#[ignore = "needs DATABASE_URL"]
async fn unpublished_episode_is_admin_only(pool: PgPool) {
    let rows = EpisodeService::create(&pool, &[variant(Language::En, "Talk")])
        .await
        .unwrap();
    let id = rows[0].id;

    let changed = EpisodeService::set_published(&pool, id, false, None)
        .await
        .unwrap();
    assert_eq!(changed, 1);

    assert!(EpisodeService::list_published(&pool, Language::En)
        .await
        .unwrap()
        .is_empty());
    assert!(EpisodeService::get_published(&pool, id, Language::En)
        .await
        .unwrap()
        .is_none());
    assert_eq!(EpisodeService::list_all(&pool).await.unwrap().len(), 1);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "needs DATABASE_URL"]
async fn failed_replace_keeps_old_variants(pool: PgPool) {
    let rows = EpisodeService::create(
        &pool,
        &[variant(Language::Sr, "Razgovor"), variant(Language::En, "Talk")],
    )
    .await
    .unwrap();
    let id = rows[0].id;

    // the second insert hits the (id, language_code) primary key
    let result = EpisodeService::replace(
        &pool,
        id,
        &[variant(Language::De, "Gespräch"), variant(Language::De, "Nochmal")],
    )
    .await;
    assert!(result.is_err());

    let mut languages: Vec<String> = EpisodeService::list_all(&pool)
        .await
        .unwrap()
        .into_iter()
        .map(|r| r.language_code)
        .collect();
    languages.sort();
    assert_eq!(languages, vec!["en", "sr"]);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "needs DATABASE_URL"]
async fn replace_of_missing_episode_is_none(pool: PgPool) {
    let result = EpisodeService::replace(&pool, Uuid::new_v4(), &[variant(Language::En, "Talk")])
        .await
        .unwrap();
    assert!(result.is_none());
}

// =============================================================================
// Auth
// =============================================================================

#[sqlx::test(migrations = "./migrations")]
#[ignore = "needs DATABASE_URL"]
async fn refresh_token_rotates_once(pool: PgPool) {
    let config = test_config();
    let signed_up = AuthService::sign_up(&pool, &config, "ana@example.com", "long enough", None)
        .await
        .unwrap();

    let rotated = AuthService::refresh(&pool, &config, &signed_up.refresh_token)
        .await
        .unwrap();
    assert_ne!(rotated.refresh_token, signed_up.refresh_token);

    let reused = AuthService::refresh(&pool, &config, &signed_up.refresh_token).await;
    assert!(matches!(reused, Err(AuthError::TokenInvalid)));

    let again = AuthService::sign_up(&pool, &config, "Ana@Example.com", "long enough", None).await;
    assert!(matches!(again, Err(AuthError::EmailTaken)));
}
