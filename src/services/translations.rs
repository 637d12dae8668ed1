use std::collections::HashMap;

use sqlx::{FromRow, PgPool};

use crate::models::{
    language::Language,
    translation::{TranslationRow, UpsertTranslationRequest},
};

pub struct TranslationService;

/// `xmax = 0` only holds for a freshly inserted tuple.
#[derive(FromRow)]
struct Upserted {
    #[sqlx(flatten)]
    row: TranslationRow,
    inserted: bool,
}

impl TranslationService {
    /// All `key → value` pairs stored for one language.
    pub async fn load_map(pool: &PgPool, language: Language) -> anyhow::Result<HashMap<String, String>> {
        let rows: Vec<(String, String)> = sqlx::query_as(
            "SELECT key, value FROM translations WHERE language_code = $1",
        )
        .bind(language.code())
        .fetch_all(pool)
        .await?;
        Ok(rows.into_iter().collect())
    }

    pub async fn list(pool: &PgPool, language: Option<Language>) -> anyhow::Result<Vec<TranslationRow>> {
        let rows = sqlx::query_as::<_, TranslationRow>(
            "SELECT id, key, language_code, value, created_at, updated_at
             FROM translations
             WHERE ($1::TEXT IS NULL OR language_code = $1)
             ORDER BY key, language_code",
        )
        .bind(language.map(Language::code))
        .fetch_all(pool)
        .await?;
        Ok(rows)
    }

    /// Insert or overwrite the value of `(key, language_code)`.
    /// Returns the row and whether it was newly inserted.
    pub async fn upsert(
        pool: &PgPool,
        req: &UpsertTranslationRequest,
    ) -> anyhow::Result<(TranslationRow, bool)> {
        let key = req.key.trim();
        if !is_valid_key(key) {
            anyhow::bail!("Invalid translation key: {key}");
        }
        let upserted = sqlx::query_as::<_, Upserted>(
            "INSERT INTO translations (key, language_code, value)
             VALUES ($1, $2, $3)
             ON CONFLICT (key, language_code) DO UPDATE SET
                 value = EXCLUDED.value,
                 updated_at = NOW()
             RETURNING id, key, language_code, value, created_at, updated_at,
                       (xmax = 0) AS inserted",
        )
        .bind(key)
        .bind(req.language_code.code())
        .bind(&req.value)
        .fetch_one(pool)
        .await?;
        Ok((upserted.row, upserted.inserted))
    }

    pub async fn delete(
        pool: &PgPool,
        language: Language,
        key: &str,
    ) -> anyhow::Result<Option<TranslationRow>> {
        let row = sqlx::query_as::<_, TranslationRow>(
            "DELETE FROM translations WHERE language_code = $1 AND key = $2
             RETURNING id, key, language_code, value, created_at, updated_at",
        )
        .bind(language.code())
        .bind(key)
        .fetch_optional(pool)
        .await?;
        Ok(row)
    }
}

/// Dot-path keys: segments of ASCII letters, digits, `_` or `-`, separated by single dots.
pub fn is_valid_key(key: &str) -> bool {
    !key.is_empty()
        && key.len() <= 200
        && key.split('.').all(|seg| {
            !seg.is_empty()
                && seg
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_validation() {
        assert!(is_valid_key("home.hero.title"));
        assert!(is_valid_key("episodes.categories.kitchen"));
        assert!(!is_valid_key(""));
        assert!(!is_valid_key("home..title"));
        assert!(!is_valid_key(".home"));
        assert!(!is_valid_key("home title"));
    }
}
