use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::language::Language;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TranslationRow {
    pub id: Uuid,
    pub key: String,
    pub language_code: String,
    pub value: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Body for PUT /api/admin/translations.
#[derive(Debug, Deserialize)]
pub struct UpsertTranslationRequest {
    pub key: String,
    pub language_code: Language,
    pub value: String,
}

#[derive(Debug, Deserialize)]
pub struct TranslationQuery {
    pub language: Option<Language>,
}

#[derive(Debug, Deserialize)]
pub struct LookupQuery {
    pub key: String,
}

/// Where the strings of a catalog currently come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CatalogSource {
    /// Database rows overlaid on the bundled catalog.
    Database,
    /// The database could not be read; bundled strings only.
    Bundled,
}

#[derive(Debug, Serialize)]
pub struct CatalogResponse {
    pub language: Language,
    pub source: CatalogSource,
    pub entries: BTreeMap<String, String>,
}
