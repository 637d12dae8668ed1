//! UI-string catalogs: database translations with the bundled locale files
//! as fallback, cached per language and kept live by the change feed.

use std::{
    collections::{BTreeMap, HashMap},
    sync::Arc,
    time::{Duration, Instant},
};

use lazy_static::lazy_static;
use serde::Deserialize;
use serde_json::Value;
use sqlx::PgPool;
use tokio::sync::{broadcast::error::RecvError, RwLock};
use tracing::{debug, info, warn};

use crate::{
    models::{language::Language, translation::CatalogSource},
    services::{
        metrics,
        realtime::{ChangeEvent, ChangeFeed, ChangeKind, ChangeTable},
        translations::TranslationService,
    },
};

/// How long a bundled-only catalog is served before the database is tried again.
const DB_RETRY_AFTER: Duration = Duration::from_secs(30);

const BUNDLED_SR: &str = include_str!("../../locales/sr.json");
const BUNDLED_DE: &str = include_str!("../../locales/de.json");
const BUNDLED_EN: &str = include_str!("../../locales/en.json");

lazy_static! {
    static ref BUNDLED: HashMap<Language, Arc<HashMap<String, String>>> = {
        let mut map = HashMap::new();
        for (lang, raw) in [
            (Language::Sr, BUNDLED_SR),
            (Language::De, BUNDLED_DE),
            (Language::En, BUNDLED_EN),
        ] {
            let flat = match serde_json::from_str::<Value>(raw) {
                Ok(v) => flatten(&v),
                Err(e) => {
                    warn!("bundled locale {lang} is not valid JSON: {e}");
                    HashMap::new()
                }
            };
            map.insert(lang, Arc::new(flat));
        }
        map
    };
}

/// The flattened bundled catalog for a language.
pub fn bundled(language: Language) -> Arc<HashMap<String, String>> {
    BUNDLED.get(&language).cloned().unwrap_or_default()
}

/// Flattens nested JSON into dot-path keys.
/// Arrays are indexed (`items.0`), scalars are stringified, nulls are skipped.
pub fn flatten(value: &Value) -> HashMap<String, String> {
    let mut out = HashMap::new();
    flatten_into("", value, &mut out);
    out
}

fn flatten_into(prefix: &str, value: &Value, out: &mut HashMap<String, String>) {
    let join = |k: &str| {
        if prefix.is_empty() {
            k.to_string()
        } else {
            format!("{prefix}.{k}")
        }
    };
    match value {
        Value::Object(map) => {
            for (k, v) in map {
                flatten_into(&join(k), v, out);
            }
        }
        Value::Array(items) => {
            for (i, v) in items.iter().enumerate() {
                flatten_into(&join(&i.to_string()), v, out);
            }
        }
        Value::String(s) => {
            out.insert(prefix.to_string(), s.clone());
        }
        Value::Null => {}
        other => {
            out.insert(prefix.to_string(), other.to_string());
        }
    }
}

/// One language's strings: database rows first, bundled file second.
#[derive(Debug, Clone)]
pub struct Catalog {
    pub language: Language,
    pub source: CatalogSource,
    database: HashMap<String, String>,
    bundled: Arc<HashMap<String, String>>,
}

impl Catalog {
    pub fn new(
        language: Language,
        database: Option<HashMap<String, String>>,
        bundled: Arc<HashMap<String, String>>,
    ) -> Self {
        let source = if database.is_some() {
            CatalogSource::Database
        } else {
            CatalogSource::Bundled
        };
        Self {
            language,
            source,
            database: database.unwrap_or_default(),
            bundled,
        }
    }

    pub fn bundled_only(language: Language) -> Self {
        Self::new(language, None, bundled(language))
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.database
            .get(key)
            .or_else(|| self.bundled.get(key))
            .map(String::as_str)
    }

    /// Lookup that never fails: a missing key comes back as itself.
    pub fn t<'a>(&'a self, key: &'a str) -> &'a str {
        self.get(key).unwrap_or(key)
    }

    /// Bundled entries overlaid with database entries.
    pub fn entries(&self) -> BTreeMap<String, String> {
        let mut merged: BTreeMap<String, String> = self
            .bundled
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        merged.extend(self.database.iter().map(|(k, v)| (k.clone(), v.clone())));
        merged
    }

    pub fn set(&mut self, key: String, value: String) {
        self.database.insert(key, value);
    }

    pub fn remove(&mut self, key: &str) {
        self.database.remove(key);
    }
}

struct Cached {
    catalog: Catalog,
    loaded_at: Instant,
}

/// Fields of a translations row carried by change events.
#[derive(Debug, Deserialize)]
struct TranslationChange {
    key: String,
    language_code: String,
    #[serde(default)]
    value: Option<String>,
}

/// Per-language catalog cache shared by all handlers.
#[derive(Default)]
pub struct TranslationStore {
    catalogs: RwLock<HashMap<Language, Cached>>,
}

impl TranslationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached catalog, loading it on first use. A bundled-only catalog is
    /// refreshed from the database once `DB_RETRY_AFTER` has passed.
    pub async fn catalog(&self, pool: &PgPool, language: Language) -> Catalog {
        {
            let catalogs = self.catalogs.read().await;
            if let Some(cached) = catalogs.get(&language) {
                let stale = cached.catalog.source == CatalogSource::Bundled
                    && cached.loaded_at.elapsed() >= DB_RETRY_AFTER;
                if !stale {
                    return cached.catalog.clone();
                }
            }
        }
        self.reload(pool, language).await
    }

    /// Refetch a language from the database, falling back to the bundled file.
    pub async fn reload(&self, pool: &PgPool, language: Language) -> Catalog {
        let catalog = match TranslationService::load_map(pool, language).await {
            Ok(map) => {
                debug!("loaded {} translations for {language}", map.len());
                Catalog::new(language, Some(map), bundled(language))
            }
            Err(e) => {
                warn!("translations for {language} unavailable, using bundled strings: {e}");
                metrics::TRANSLATION_FALLBACKS
                    .with_label_values(&[language.code()])
                    .inc();
                Catalog::bundled_only(language)
            }
        };

        self.catalogs.write().await.insert(
            language,
            Cached {
                catalog: catalog.clone(),
                loaded_at: Instant::now(),
            },
        );
        catalog
    }

    /// Apply a translations change to the cached catalog of its language.
    /// Languages not cached yet pick the change up on their first load.
    pub async fn apply(&self, event: &ChangeEvent) {
        if event.table != ChangeTable::Translations {
            return;
        }
        let change: TranslationChange = match serde_json::from_value(event.record.clone()) {
            Ok(c) => c,
            Err(e) => {
                warn!("ignoring malformed translation change: {e}");
                return;
            }
        };
        let Ok(language) = change.language_code.parse::<Language>() else {
            return;
        };

        let mut catalogs = self.catalogs.write().await;
        let Some(cached) = catalogs.get_mut(&language) else {
            return;
        };
        match (event.kind, change.value) {
            (ChangeKind::Delete, _) => cached.catalog.remove(&change.key),
            (_, Some(value)) => cached.catalog.set(change.key, value),
            (_, None) => {}
        }
    }

    /// Keep the cache in sync with the change feed for the process lifetime.
    pub fn spawn_listener(self: Arc<Self>, feed: &ChangeFeed) {
        let mut rx = feed.subscribe();
        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(event) => self.apply(&event).await,
                    Err(RecvError::Lagged(missed)) => {
                        // Dropped events cannot be replayed; force fresh loads.
                        warn!("translation listener lagged by {missed} events, clearing cache");
                        self.catalogs.write().await.clear();
                    }
                    Err(RecvError::Closed) => break,
                }
            }
            info!("translation listener stopped");
        });
    }

    #[cfg(test)]
    async fn insert(&self, catalog: Catalog) {
        self.catalogs.write().await.insert(
            catalog.language,
            Cached {
                catalog,
                loaded_at: Instant::now(),
            },
        );
    }

    #[cfg(test)]
    async fn cached(&self, language: Language) -> Option<Catalog> {
        self.catalogs
            .read()
            .await
            .get(&language)
            .map(|c| c.catalog.clone())
    }
}
