use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use sqlx::PgPool;

use crate::models::language::Language;

/// Tables whose row counts the inspector reports.
const TABLES: &[&str] = &[
    "content",
    "episodes",
    "translations",
    "guest_requests",
    "newsletter_subscribers",
    "gdpr_consents",
    "profiles",
];

#[derive(Debug, Serialize)]
pub struct TableCount {
    pub table: &'static str,
    pub rows: i64,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct LanguageCoverage {
    pub language: Language,
    pub keys: usize,
    /// Keys some other language has but this one lacks.
    pub missing: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct InspectorReport {
    pub tables: Vec<TableCount>,
    pub translations: Vec<LanguageCoverage>,
}

/// Translation coverage per language from `(key, language_code)` pairs.
/// Pairs with an unsupported language code are ignored.
pub fn coverage(pairs: &[(String, String)]) -> Vec<LanguageCoverage> {
    let mut by_lang: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
    let mut all: BTreeSet<&str> = BTreeSet::new();
    for (key, lang) in pairs {
        if lang.parse::<Language>().is_err() {
            continue;
        }
        by_lang.entry(lang.as_str()).or_default().insert(key.as_str());
        all.insert(key.as_str());
    }

    Language::ALL
        .into_iter()
        .map(|language| {
            let have = by_lang.get(language.code());
            let missing = all
                .iter()
                .filter(|k| !have.is_some_and(|h| h.contains(*k)))
                .map(|k| k.to_string())
                .collect();
            LanguageCoverage {
                language,
                keys: have.map_or(0, |h| h.len()),
                missing,
            }
        })
        .collect()
}

pub struct InspectorService;

impl InspectorService {
    pub async fn report(pool: &PgPool) -> anyhow::Result<InspectorReport> {
        let mut tables = Vec::with_capacity(TABLES.len());
        for &table in TABLES {
            // table names come from the constant list above
            let rows: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table}"))
                .fetch_one(pool)
                .await?;
            tables.push(TableCount { table, rows });
        }

        let pairs: Vec<(String, String)> =
            sqlx::query_as("SELECT key, language_code FROM translations")
                .fetch_all(pool)
                .await?;

        Ok(InspectorReport {
            tables,
            translations: coverage(&pairs),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair(key: &str, lang: &str) -> (String, String) {
        (key.to_string(), lang.to_string())
    }

    #[test]
    fn reports_keys_missing_per_language() {
        let report = coverage(&[
            pair("nav.home", "sr"),
            pair("nav.home", "en"),
            pair("nav.home", "de"),
            pair("nav.kitchen", "sr"),
            pair("nav.kitchen", "en"),
            pair("nav.stories", "en"),
            pair("nav.ignored", "fr"),
        ]);

        let de = report.iter().find(|c| c.language == Language::De).unwrap();
        assert_eq!(de.keys, 1);
        assert_eq!(de.missing, vec!["nav.kitchen", "nav.stories"]);

        let en = report.iter().find(|c| c.language == Language::En).unwrap();
        assert_eq!(en.keys, 3);
        assert!(en.missing.is_empty());
    }

    #[test]
    fn empty_table_has_no_gaps() {
        let report = coverage(&[]);
        assert_eq!(report.len(), 3);
        assert!(report.iter().all(|c| c.keys == 0 && c.missing.is_empty()));
    }
}
