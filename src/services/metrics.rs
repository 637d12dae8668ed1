use lazy_static::lazy_static;
use prometheus::{register_counter_vec, register_gauge_vec, CounterVec, GaugeVec};
use sqlx::PgPool;
use tracing::{info, warn};

use crate::{
    models::{episode::Category, language::Language},
    services::episodes,
};

lazy_static! {
    // ── Event counters (increment on each event) ────────────────────────────
    pub static ref FORM_SUBMISSIONS: CounterVec = register_counter_vec!(
        "site_form_submissions_total",
        "Public form submissions by form and language",
        &["form", "language"]
    ).unwrap();

    pub static ref SIGN_INS: CounterVec = register_counter_vec!(
        "site_sign_ins_total",
        "Sign-in attempts by status",
        &["status"]
    ).unwrap();

    pub static ref CONTENT_WRITES: CounterVec = register_counter_vec!(
        "site_content_writes_total",
        "Admin writes by table and action",
        &["table", "action"]
    ).unwrap();

    pub static ref TRANSLATION_FALLBACKS: CounterVec = register_counter_vec!(
        "site_translation_fallbacks_total",
        "Catalog loads that fell back to bundled strings",
        &["language"]
    ).unwrap();

    pub static ref UPLOADS: CounterVec = register_counter_vec!(
        "site_uploads_total",
        "Content image uploads by status",
        &["status"]
    ).unwrap();

    // ── Site metrics (refreshed by the collector) ────────────────────────────
    pub static ref PUBLISHED_EPISODES: GaugeVec = register_gauge_vec!(
        "site_published_episodes",
        "Published episodes by language and category",
        &["language", "category"]
    ).unwrap();

    pub static ref TRANSLATION_KEYS: GaugeVec = register_gauge_vec!(
        "site_translation_keys",
        "Translation rows stored per language",
        &["language"]
    ).unwrap();
}

/// Spawn the background metrics collector (refreshes every 5 minutes).
pub fn start(pool: PgPool) {
    tokio::spawn(async move {
        if let Err(e) = collect(&pool).await {
            warn!("Metrics: initial collection failed: {}", e);
        }
        loop {
            tokio::time::sleep(tokio::time::Duration::from_secs(300)).await;
            if let Err(e) = collect(&pool).await {
                warn!("Metrics: collection failed: {}", e);
            }
        }
    });
}

async fn collect(pool: &PgPool) -> anyhow::Result<()> {
    for language in Language::ALL {
        let rows = episodes::EpisodeService::list_published(pool, language).await?;
        let views: Vec<_> = rows.iter().map(episodes::to_view).collect();
        let counts = episodes::count_by_category(&views);
        for category in Category::ALL {
            PUBLISHED_EPISODES
                .with_label_values(&[language.code(), category.as_str()])
                .set(counts.get(category) as f64);
        }

        let keys: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM translations WHERE language_code = $1")
                .bind(language.code())
                .fetch_one(pool)
                .await?;
        TRANSLATION_KEYS
            .with_label_values(&[language.code()])
            .set(keys as f64);
    }
    info!("Metrics: collection complete");
    Ok(())
}
