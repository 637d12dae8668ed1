use std::sync::Arc;

use redis::Client as RedisClient;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use podcast_cms_api::{
    build_router,
    config::Config,
    db,
    services::{email::EmailService, i18n::TranslationStore, metrics, realtime::ChangeFeed},
    AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Arc::new(Config::from_env()?);

    let pool = db::create_pool(&config.database_url).await?;
    db::run_migrations(&pool).await?;
    info!("Database connected and migrations applied");

    let (redis_client, redis_conn) = match config.redis_url.as_deref() {
        Some(url) => {
            let client = RedisClient::open(url)?;
            let conn = client.get_multiplexed_async_connection().await?;
            info!("Redis connected");
            (Some(client), Some(conn))
        }
        None => {
            warn!("REDIS_URL not set: rate limiting disabled, change feed is local only");
            (None, None)
        }
    };

    let feed = Arc::new(ChangeFeed::new(redis_conn.clone()));
    if let Some(client) = redis_client {
        feed.spawn_redis_bridge(client);
    }

    let translations = Arc::new(TranslationStore::new());
    translations.clone().spawn_listener(&feed);

    metrics::start(pool.clone());

    let email = EmailService::new(&config).map(Arc::new);
    if email.is_some() {
        info!("SMTP email service configured");
    } else {
        info!("SMTP not configured, guest request notifications disabled");
    }

    let state = AppState {
        db: pool,
        redis: redis_conn,
        config: config.clone(),
        translations,
        feed,
        email,
    };

    let app = build_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    info!("podcast CMS API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
